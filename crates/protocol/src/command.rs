use bytes::Bytes;

use faisca_common::CommandError;

use crate::{Frame, Parse};

/// Condição de aplicação do SET (NX ou XX). As duas juntas são um erro de
/// sintaxe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetCondition {
    /// Só escreve se a chave não existir (expirada conta como ausente).
    Nx,
    /// Só escreve se a chave já existir (e não estiver expirada).
    Xx,
}

/// Prazo de expiração do SET, como veio na linha de comando.
///
/// EX/PX são relativos ao momento do comando; EXAT/PXAT são deadlines
/// absolutos em epoch Unix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expiry {
    Ex(u64),
    Px(u64),
    ExAt(u64),
    PxAt(u64),
}

impl Expiry {
    /// Resolve o prazo em deadline absoluto (epoch ms), dado o "agora" do
    /// relógio do store. Aritmética saturante: prazos absurdamente grandes
    /// viram "nunca na prática", nunca overflow.
    pub fn deadline_ms(self, now_ms: u64) -> u64 {
        match self {
            Expiry::Ex(secs) => now_ms.saturating_add(secs.saturating_mul(1000)),
            Expiry::Px(ms) => now_ms.saturating_add(ms),
            Expiry::ExAt(secs) => secs.saturating_mul(1000),
            Expiry::PxAt(ms) => ms,
        }
    }
}

/// Opções do comando SET.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetOptions {
    pub condition: Option<SetCondition>,
    pub get: bool,
    pub expiry: Option<Expiry>,
}

/// Enum com todos os comandos reconhecidos.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ping(Option<Bytes>),
    Get(String),
    Set {
        key: String,
        value: Bytes,
        options: SetOptions,
    },
    Del(Vec<String>),
    Exists(Vec<String>),
    Incr(String),
    Decr(String),
    LPush {
        key: String,
        values: Vec<Bytes>,
    },
    RPush {
        key: String,
        values: Vec<Bytes>,
    },
    LRange {
        key: String,
        start: i64,
        stop: i64,
    },
    FlushDb,
}

impl Command {
    /// Faz o parse de um Frame em um Command.
    ///
    /// Nome de comando é case-insensitive. Cada comando tem um esquema fixo
    /// de aridade mínima/máxima, checado aqui antes de extrair argumentos;
    /// a gramática de opções do SET fica em `parse_set`.
    pub fn from_frame(frame: Frame) -> Result<Command, CommandError> {
        let mut parse = Parse::new(frame)?;
        if !parse.has_remaining() {
            return Err(CommandError::Empty);
        }

        let name = parse.next_string()?;

        match name.to_uppercase().as_str() {
            "PING" => {
                arity(&parse, "ping", 0, Some(1))?;
                let msg = if parse.has_remaining() {
                    Some(parse.next_bytes()?)
                } else {
                    None
                };
                Ok(Command::Ping(msg))
            }
            "GET" => {
                arity(&parse, "get", 1, Some(1))?;
                Ok(Command::Get(parse.next_string()?))
            }
            "SET" => {
                arity(&parse, "set", 2, None)?;
                parse_set(&mut parse)
            }
            "DEL" => {
                arity(&parse, "del", 1, None)?;
                Ok(Command::Del(collect_strings(&mut parse)?))
            }
            "EXISTS" => {
                arity(&parse, "exists", 1, None)?;
                Ok(Command::Exists(collect_strings(&mut parse)?))
            }
            "INCR" => {
                arity(&parse, "incr", 1, Some(1))?;
                Ok(Command::Incr(parse.next_string()?))
            }
            "DECR" => {
                arity(&parse, "decr", 1, Some(1))?;
                Ok(Command::Decr(parse.next_string()?))
            }
            // LPUSH/RPUSH aceitam zero valores: a chave ainda precisa ser
            // lista (ou ausente), então o comando não é um no-op completo
            "LPUSH" => {
                arity(&parse, "lpush", 1, None)?;
                let key = parse.next_string()?;
                let values = collect_bytes(&mut parse)?;
                Ok(Command::LPush { key, values })
            }
            "RPUSH" => {
                arity(&parse, "rpush", 1, None)?;
                let key = parse.next_string()?;
                let values = collect_bytes(&mut parse)?;
                Ok(Command::RPush { key, values })
            }
            "LRANGE" => {
                arity(&parse, "lrange", 3, Some(3))?;
                let key = parse.next_string()?;
                let start = parse.next_int()?;
                let stop = parse.next_int()?;
                Ok(Command::LRange { key, start, stop })
            }
            "FLUSHDB" => {
                // modificador opcional (estilo ASYNC/SYNC), ignorado
                arity(&parse, "flushdb", 0, Some(1))?;
                Ok(Command::FlushDb)
            }
            _ => Err(CommandError::Unknown(name)),
        }
    }
}

/// Esquema de aridade: `min`/`max` contam argumentos após o nome do comando.
fn arity(parse: &Parse, name: &str, min: usize, max: Option<usize>) -> Result<(), CommandError> {
    let n = parse.remaining();
    if n < min || max.is_some_and(|m| n > m) {
        return Err(CommandError::WrongArity(name.into()));
    }
    Ok(())
}

fn collect_strings(parse: &mut Parse) -> Result<Vec<String>, CommandError> {
    let mut out = Vec::with_capacity(parse.remaining());
    while parse.has_remaining() {
        out.push(parse.next_string()?);
    }
    Ok(out)
}

fn collect_bytes(parse: &mut Parse) -> Result<Vec<Bytes>, CommandError> {
    let mut out = Vec::with_capacity(parse.remaining());
    while parse.has_remaining() {
        out.push(parse.next_bytes()?);
    }
    Ok(out)
}

fn parse_set(parse: &mut Parse) -> Result<Command, CommandError> {
    let key = parse.next_string()?;
    let value = parse.next_bytes()?;

    let mut options = SetOptions::default();

    while parse.has_remaining() {
        let opt = parse.next_string()?.to_uppercase();
        match opt.as_str() {
            "NX" => {
                if options.condition == Some(SetCondition::Xx) {
                    return Err(CommandError::Syntax);
                }
                options.condition = Some(SetCondition::Nx);
            }
            "XX" => {
                if options.condition == Some(SetCondition::Nx) {
                    return Err(CommandError::Syntax);
                }
                options.condition = Some(SetCondition::Xx);
            }
            "GET" => options.get = true,
            "EX" => put_expiry(&mut options, Expiry::Ex(next_positive(parse)?))?,
            "PX" => put_expiry(&mut options, Expiry::Px(next_positive(parse)?))?,
            "EXAT" => put_expiry(&mut options, Expiry::ExAt(next_positive(parse)?))?,
            "PXAT" => put_expiry(&mut options, Expiry::PxAt(next_positive(parse)?))?,
            _ => return Err(CommandError::Syntax),
        }
    }

    Ok(Command::Set {
        key,
        value,
        options,
    })
}

/// No máximo uma opção de expiração por comando.
fn put_expiry(options: &mut SetOptions, expiry: Expiry) -> Result<(), CommandError> {
    if options.expiry.is_some() {
        return Err(CommandError::Syntax);
    }
    options.expiry = Some(expiry);
    Ok(())
}

/// Operando de EX/PX/EXAT/PXAT: inteiro decimal estritamente positivo.
fn next_positive(parse: &mut Parse) -> Result<u64, CommandError> {
    if !parse.has_remaining() {
        return Err(CommandError::Syntax);
    }
    let n = parse.next_int()?;
    if n <= 0 {
        return Err(CommandError::Syntax);
    }
    Ok(n as u64)
}
