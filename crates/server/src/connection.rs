use bytes::BytesMut;
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use faisca_common::{ConnectionError, INITIAL_BUFFER_CAPACITY, ProtocolError};
use faisca_protocol::Frame;

/// Wrapper sobre TcpStream com buffer para leitura/escrita de frames RESP.
///
/// É o adaptador de sessão: converte bytes em frames e frames em bytes; a
/// semântica dos comandos mora no dispatcher.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Lê um frame completo do stream. Retorna None no EOF limpo.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                // EOF no meio de um frame
                return Err(ConnectionError::ConnectionReset);
            }
        }
    }

    /// Escreve um frame no stream e dá flush.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut cursor) {
            Ok(()) => {
                let len = cursor.position() as usize;
                cursor.set_position(0);
                let frame = Frame::parse(&mut cursor).map_err(invalid_data)?;
                self.buffer = self.buffer.split_off(len);
                Ok(Some(frame))
            }
            Err(ProtocolError::Incomplete) => Ok(None),
            // erro de enquadramento é fatal para a conexão
            Err(e) => Err(invalid_data(e)),
        }
    }
}

fn invalid_data(e: ProtocolError) -> ConnectionError {
    ConnectionError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        e.to_string(),
    ))
}
