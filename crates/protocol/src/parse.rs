use bytes::Bytes;

use faisca_common::CommandError;

use crate::Frame;

/// Cursor sobre um Frame::Array para consumir argumentos em sequência.
pub struct Parse {
    parts: std::vec::IntoIter<Frame>,
}

impl Parse {
    /// Cria um Parse a partir de um Frame. Requests válidos são sempre
    /// arrays de bulk strings.
    pub fn new(frame: Frame) -> Result<Parse, CommandError> {
        match frame {
            Frame::Array(parts) => Ok(Parse {
                parts: parts.into_iter(),
            }),
            _ => Err(CommandError::InvalidArgument(
                "esperado array de bulk strings".into(),
            )),
        }
    }

    /// Consome o próximo elemento como String (de Bulk ou Simple).
    pub fn next_string(&mut self) -> Result<String, CommandError> {
        match self.next()? {
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(data) => String::from_utf8(data.to_vec())
                .map_err(|_| CommandError::InvalidArgument("string UTF-8 inválida".into())),
            _ => Err(CommandError::InvalidArgument(
                "esperado string ou bulk".into(),
            )),
        }
    }

    /// Consome o próximo elemento como Bytes.
    pub fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        match self.next()? {
            Frame::Bulk(data) => Ok(data),
            Frame::Simple(s) => Ok(Bytes::from(s)),
            _ => Err(CommandError::InvalidArgument("esperado bulk".into())),
        }
    }

    /// Consome o próximo elemento como inteiro decimal assinado.
    /// Texto não numérico é erro de sintaxe (nível protocolo, não dado).
    pub fn next_int(&mut self) -> Result<i64, CommandError> {
        match self.next()? {
            Frame::Integer(n) => Ok(n),
            Frame::Bulk(data) => std::str::from_utf8(&data)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(CommandError::Syntax),
            Frame::Simple(s) => s.parse::<i64>().map_err(|_| CommandError::Syntax),
            _ => Err(CommandError::Syntax),
        }
    }

    /// Quantos argumentos ainda não foram consumidos.
    pub fn remaining(&self) -> usize {
        self.parts.len()
    }

    pub fn has_remaining(&self) -> bool {
        self.parts.len() > 0
    }

    fn next(&mut self) -> Result<Frame, CommandError> {
        self.parts
            .next()
            .ok_or_else(|| CommandError::InvalidArgument("argumentos insuficientes".into()))
    }
}
