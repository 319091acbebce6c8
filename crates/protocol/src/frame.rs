use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

use faisca_common::{MAX_FRAME_SIZE, ProtocolError};

/// Representação de um frame RESP2, nas duas direções (request e reply).
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Varre o buffer e verifica se um frame completo está disponível, sem
    /// alocar. `Err(Incomplete)` significa "precisa de mais bytes".
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        match next_byte(src)? {
            b'+' | b'-' | b':' => {
                read_line(src)?;
                Ok(())
            }
            b'$' => match read_decimal(src)? {
                -1 => Ok(()), // null bulk
                len if len < 0 => Err(ProtocolError::InvalidBulkLength(len)),
                len if len as usize > MAX_FRAME_SIZE => {
                    Err(ProtocolError::FrameTooLarge(len as usize))
                }
                len => advance(src, len as usize + 2), // payload + \r\n
            },
            b'*' => match read_decimal(src)? {
                -1 => Ok(()), // null array
                count if count < 0 => Err(ProtocolError::InvalidBulkLength(count)),
                count => {
                    for _ in 0..count {
                        Frame::check(src)?;
                    }
                    Ok(())
                }
            },
            byte => Err(ProtocolError::InvalidFrameType(byte)),
        }
    }

    /// Constrói o Frame a partir do cursor. Pressupõe que `check()` já
    /// validou que o frame está completo.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        match next_byte(src)? {
            b'+' => Ok(Frame::Simple(read_utf8_line(src)?)),
            b'-' => Ok(Frame::Error(read_utf8_line(src)?)),
            b':' => Ok(Frame::Integer(read_decimal(src)?)),
            b'$' => {
                let len = read_decimal(src)?;
                if len == -1 {
                    return Ok(Frame::Null);
                }
                let len = len as usize;
                if src.remaining() < len + 2 {
                    return Err(ProtocolError::Incomplete);
                }
                let start = src.position() as usize;
                let data = Bytes::copy_from_slice(&src.get_ref()[start..start + len]);
                src.set_position((start + len + 2) as u64);
                Ok(Frame::Bulk(data))
            }
            b'*' => {
                let count = read_decimal(src)?;
                if count == -1 {
                    return Ok(Frame::Null);
                }
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(Frame::parse(src)?);
                }
                Ok(Frame::Array(items))
            }
            byte => Err(ProtocolError::InvalidFrameType(byte)),
        }
    }

    /// Serializa o frame no buffer de saída em formato RESP2.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                dst.put_u8(b'+');
                dst.put(s.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Error(s) => {
                dst.put_u8(b'-');
                dst.put(s.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Integer(n) => {
                dst.put_u8(b':');
                dst.put(n.to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Bulk(data) => {
                dst.put_u8(b'$');
                dst.put(data.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                dst.put(data.as_ref());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Null => {
                dst.put(&b"$-1\r\n"[..]);
            }
            Frame::Array(items) => {
                dst.put_u8(b'*');
                dst.put(items.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                for item in items {
                    item.encode(dst);
                }
            }
        }
    }

    /// Helper: cria um Frame::Bulk a partir de &str.
    pub fn bulk(s: &str) -> Frame {
        Frame::Bulk(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// Helper: cria um Array de Bulk strings a partir de &[&str].
    pub fn array_from_strs(strs: &[&str]) -> Frame {
        Frame::Array(strs.iter().map(|s| Frame::bulk(s)).collect())
    }
}

fn next_byte(src: &mut Cursor<&[u8]>) -> Result<u8, ProtocolError> {
    if !src.has_remaining() {
        return Err(ProtocolError::Incomplete);
    }
    Ok(src.get_u8())
}

fn advance(src: &mut Cursor<&[u8]>, n: usize) -> Result<(), ProtocolError> {
    if src.remaining() < n {
        return Err(ProtocolError::Incomplete);
    }
    src.set_position(src.position() + n as u64);
    Ok(())
}

/// Lê até o próximo \r\n (exclusivo) e posiciona o cursor depois dele.
fn read_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let start = src.position() as usize;
    let buf = *src.get_ref();

    if let Some(offset) = buf[start..].windows(2).position(|w| w == b"\r\n") {
        src.set_position((start + offset + 2) as u64);
        return Ok(&buf[start..start + offset]);
    }

    Err(ProtocolError::Incomplete)
}

fn read_utf8_line(src: &mut Cursor<&[u8]>) -> Result<String, ProtocolError> {
    let line = read_line(src)?;
    String::from_utf8(line.to_vec()).map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))
}

fn read_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, ProtocolError> {
    let line = read_line(src)?;
    let s = std::str::from_utf8(line).map_err(|e| ProtocolError::InvalidInteger(e.to_string()))?;
    s.parse::<i64>()
        .map_err(|e| ProtocolError::InvalidInteger(e.to_string()))
}
