use bytes::Bytes;
use std::collections::VecDeque;

/// Variante do valor armazenado.
///
/// A variante de uma chave é fixa depois de criada: operações que esperam
/// a outra variante falham com WrongType, nunca coagem.
#[derive(Debug, Clone)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
}

/// Entrada no keyspace: valor + deadline absoluto opcional (epoch ms).
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    pub expires_at: Option<u64>,
}

impl Entry {
    pub fn new(value: Value, expires_at: Option<u64>) -> Self {
        Self { value, expires_at }
    }

    /// Entrada com deadline <= agora está logicamente ausente.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at.is_some_and(|t| now_ms >= t)
    }
}
