use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::debug;

use faisca_common::{ConnectionError, StorageError};
use faisca_protocol::{Command, Frame};
use faisca_storage::{Db, SetOutcome, Side};

use crate::Connection;

/// Loop principal de tratamento de uma conexão.
///
/// Um comando por vez: lê um frame, executa, responde. Nenhum erro de
/// comando é fatal; a conexão continua servindo os requests seguintes.
pub async fn handle_connection(
    mut conn: Connection,
    db: Db,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let frame = tokio::select! {
            result = conn.read_frame() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let frame = match frame {
            Some(f) => f,
            None => return Ok(()), // EOF
        };

        let response = match Command::from_frame(frame) {
            Ok(cmd) => {
                debug!("comando recebido: {cmd:?}");
                execute(&cmd, &db)
            }
            Err(e) => Frame::Error(format!("ERR {e}")),
        };

        conn.write_frame(&response).await?;
    }
}

/// Executa um comando contra o keyspace e monta o frame de resposta.
///
/// Cada comando é uma transição única e auto-contida: nenhum estado
/// sobrevive entre requests e nada é re-tentado.
pub fn execute(cmd: &Command, db: &Db) -> Frame {
    match cmd {
        Command::Ping(msg) => match msg {
            Some(m) => Frame::Bulk(m.clone()),
            None => Frame::Bulk(Bytes::from_static(b"PONG")),
        },
        Command::Get(key) => match db.get(key) {
            Ok(Some(value)) => Frame::Bulk(value),
            Ok(None) => Frame::Null,
            Err(e) => storage_error(e),
        },
        Command::Set {
            key,
            value,
            options,
        } => match db.set(key.clone(), value.clone(), options) {
            Ok(SetOutcome::Applied) => Frame::Simple("OK".into()),
            Ok(SetOutcome::AppliedGet(Some(previous))) => Frame::Bulk(previous),
            // GET sem valor anterior, ou condição NX/XX não satisfeita
            Ok(SetOutcome::AppliedGet(None)) | Ok(SetOutcome::Skipped) => Frame::Null,
            Err(e) => storage_error(e),
        },
        Command::Del(keys) => Frame::Integer(db.del(keys) as i64),
        Command::Exists(keys) => Frame::Integer(db.exists(keys) as i64),
        Command::Incr(key) => int_reply(db.incr(key)),
        Command::Decr(key) => int_reply(db.decr(key)),
        Command::LPush { key, values } => len_reply(db.push(key, values, Side::Left)),
        Command::RPush { key, values } => len_reply(db.push(key, values, Side::Right)),
        Command::LRange { key, start, stop } => match db.range(key, *start, *stop) {
            Ok(items) => Frame::Array(items.into_iter().map(Frame::Bulk).collect()),
            Err(e) => storage_error(e),
        },
        Command::FlushDb => {
            db.flush();
            Frame::Simple("OK".into())
        }
    }
}

fn int_reply(result: Result<i64, StorageError>) -> Frame {
    match result {
        Ok(n) => Frame::Integer(n),
        Err(e) => storage_error(e),
    }
}

fn len_reply(result: Result<usize, StorageError>) -> Frame {
    match result {
        Ok(len) => Frame::Integer(len as i64),
        Err(e) => storage_error(e),
    }
}

/// Tradução dos erros do engine para o texto canônico do Redis.
fn storage_error(err: StorageError) -> Frame {
    match err {
        StorageError::WrongType => Frame::Error(
            "WRONGTYPE Operation against a key holding the wrong kind of value".into(),
        ),
        StorageError::NotAnInteger => {
            Frame::Error("ERR value is not an integer or out of range".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mesmo caminho do loop de conexão: parse + execute, erros viram
    /// frame de erro.
    fn run(db: &Db, args: &[&str]) -> Frame {
        dispatch(db, Frame::array_from_strs(args))
    }

    fn dispatch(db: &Db, frame: Frame) -> Frame {
        match Command::from_frame(frame) {
            Ok(cmd) => execute(&cmd, db),
            Err(e) => Frame::Error(format!("ERR {e}")),
        }
    }

    fn assert_error_contains(frame: &Frame, needle: &str) {
        match frame {
            Frame::Error(msg) => assert!(
                msg.contains(needle),
                "esperado erro contendo {needle:?}, veio {msg:?}"
            ),
            other => panic!("esperado Frame::Error, veio {other:?}"),
        }
    }

    #[test]
    fn ping_replies_pong() {
        let db = Db::new();
        assert_eq!(run(&db, &["PING"]), Frame::Bulk(Bytes::from("PONG")));
    }

    #[test]
    fn ping_echoes_argument() {
        let db = Db::new();
        assert_eq!(run(&db, &["PING", "arg"]), Frame::Bulk(Bytes::from("arg")));
    }

    #[test]
    fn empty_command_reports_protocol_error() {
        let db = Db::new();
        let reply = dispatch(&db, Frame::Array(vec![]));
        assert_eq!(
            reply,
            Frame::Error("ERR Protocol error: empty command".into())
        );
    }

    #[test]
    fn unknown_command_reports_name() {
        let db = Db::new();
        let reply = run(&db, &["pinggggggggggg"]);
        assert_eq!(
            reply,
            Frame::Error("ERR unknown command 'pinggggggggggg'".into())
        );
    }

    #[test]
    fn wrong_arity_reports_command_name() {
        let db = Db::new();
        let reply = run(&db, &["GET"]);
        assert_eq!(
            reply,
            Frame::Error("ERR wrong number of arguments for 'get' command".into())
        );
    }

    #[test]
    fn set_then_get_roundtrip() {
        let db = Db::new();
        assert_eq!(run(&db, &["SET", "key", "value"]), Frame::Simple("OK".into()));
        assert_eq!(run(&db, &["GET", "key"]), Frame::Bulk(Bytes::from("value")));
    }

    #[test]
    fn get_missing_is_null() {
        let db = Db::new();
        assert_eq!(run(&db, &["GET", "missing"]), Frame::Null);
    }

    #[test]
    fn set_nx_skip_replies_null() {
        let db = Db::new();
        run(&db, &["SET", "key", "v1"]);
        assert_eq!(run(&db, &["SET", "key", "v2", "NX"]), Frame::Null);
        assert_eq!(run(&db, &["GET", "key"]), Frame::Bulk(Bytes::from("v1")));
    }

    #[test]
    fn set_xx_skip_replies_null() {
        let db = Db::new();
        assert_eq!(run(&db, &["SET", "key", "v", "XX"]), Frame::Null);
    }

    #[test]
    fn set_get_option_replies_previous() {
        let db = Db::new();
        assert_eq!(run(&db, &["SET", "key", "v1", "GET"]), Frame::Null);
        assert_eq!(
            run(&db, &["SET", "key", "v2", "GET"]),
            Frame::Bulk(Bytes::from("v1"))
        );
    }

    #[test]
    fn set_nx_xx_together_is_syntax_error() {
        let db = Db::new();
        assert_eq!(
            run(&db, &["SET", "key", "v", "NX", "XX"]),
            Frame::Error("ERR syntax error".into())
        );
    }

    #[test]
    fn exists_and_del_count() {
        let db = Db::new();
        run(&db, &["SET", "a", "1"]);
        run(&db, &["SET", "b", "2"]);

        assert_eq!(run(&db, &["EXISTS", "a", "b", "c"]), Frame::Integer(2));
        assert_eq!(run(&db, &["DEL", "a", "c"]), Frame::Integer(1));
        assert_eq!(run(&db, &["EXISTS", "a"]), Frame::Integer(0));
    }

    #[test]
    fn incr_decr_replies_new_value() {
        let db = Db::new();
        assert_eq!(run(&db, &["INCR", "counter"]), Frame::Integer(1));
        assert_eq!(run(&db, &["DECR", "counter"]), Frame::Integer(0));
        assert_eq!(run(&db, &["DECR", "counter"]), Frame::Integer(-1));
    }

    #[test]
    fn incr_non_numeric_is_error() {
        let db = Db::new();
        run(&db, &["SET", "key", "value"]);
        assert_eq!(
            run(&db, &["INCR", "key"]),
            Frame::Error("ERR value is not an integer or out of range".into())
        );
    }

    #[test]
    fn push_and_range_reply_shapes() {
        let db = Db::new();
        assert_eq!(run(&db, &["RPUSH", "list", "a", "b"]), Frame::Integer(2));
        assert_eq!(run(&db, &["LPUSH", "list", "z"]), Frame::Integer(3));
        assert_eq!(
            run(&db, &["LRANGE", "list", "0", "-1"]),
            Frame::Array(vec![
                Frame::Bulk(Bytes::from("z")),
                Frame::Bulk(Bytes::from("a")),
                Frame::Bulk(Bytes::from("b")),
            ])
        );
    }

    #[test]
    fn list_ops_on_string_are_wrongtype() {
        let db = Db::new();
        run(&db, &["SET", "key", "value"]);

        let wrongtype =
            Frame::Error("WRONGTYPE Operation against a key holding the wrong kind of value".into());
        assert_eq!(run(&db, &["LPUSH", "key"]), wrongtype);
        assert_eq!(run(&db, &["RPUSH", "key", "a"]), wrongtype);
        assert_eq!(run(&db, &["LRANGE", "key", "0", "-1"]), wrongtype);
    }

    #[test]
    fn get_on_list_is_wrongtype() {
        let db = Db::new();
        run(&db, &["RPUSH", "list", "a"]);
        assert_error_contains(&run(&db, &["GET", "list"]), "WRONGTYPE");
    }

    #[test]
    fn flushdb_empties_keyspace() {
        let db = Db::new();
        run(&db, &["SET", "a", "1"]);
        run(&db, &["RPUSH", "list", "x"]);

        assert_eq!(run(&db, &["FLUSHDB"]), Frame::Simple("OK".into()));
        assert_eq!(run(&db, &["EXISTS", "a", "list"]), Frame::Integer(0));
    }

    #[test]
    fn error_does_not_poison_following_commands() {
        let db = Db::new();
        run(&db, &["SET", "key", "value"]);
        assert_error_contains(&run(&db, &["INCR", "key"]), "not an integer");
        // o loop continua atendendo normalmente
        assert_eq!(run(&db, &["GET", "key"]), Frame::Bulk(Bytes::from("value")));
    }
}
