use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::debug;

use faisca_common::StorageError;
use faisca_protocol::{SetCondition, SetOptions};

use crate::clock::{Clock, SystemClock};
use crate::entry::{Entry, Value};

/// Lado de inserção de um push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Side {
    /// Cada valor entra na cabeça, um por vez: [1,2,3] vira [3,2,1].
    Left,
    /// Valores entram na cauda, na ordem dada.
    Right,
}

/// Resultado de um SET bem-sucedido (ou pulado), já na forma que o
/// dispatcher precisa para montar a resposta.
#[derive(Debug, Clone, PartialEq)]
pub enum SetOutcome {
    /// Escrita aplicada, sem opção GET: responde OK.
    Applied,
    /// Escrita aplicada com GET: responde o valor String anterior, se havia.
    AppliedGet(Option<Bytes>),
    /// Condição NX/XX não satisfeita: o keyspace não mudou, inclusive o TTL
    /// anterior da chave.
    Skipped,
}

/// Estado compartilhado entre todas as conexões.
struct Shared {
    /// Keyspace inteiro sob um único lock exclusivo: cada comando executa
    /// seu read-modify-write como um passo indivisível, inclusive comandos
    /// multi-chave (EXISTS/DEL enxergam um snapshot consistente).
    data: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

/// Handle para o keyspace in-memory. Clonar é barato (Arc).
#[derive(Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

impl Db {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Injeta um relógio alternativo. Testes de expiração usam isto para
    /// avançar o tempo deterministicamente.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Db {
            shared: Arc::new(Shared {
                data: Mutex::new(HashMap::new()),
                clock,
            }),
        }
    }

    fn now_ms(&self) -> u64 {
        self.shared.clock.now_ms()
    }

    /// Um comando que entrou em pânico não pode travar o servidor inteiro:
    /// herdamos o guard mesmo envenenado.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.shared
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // --- Operações de string ---

    /// Lê o valor String de uma chave. Chave de lista é erro de tipo.
    pub fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let now = self.now_ms();
        let mut map = self.lock();
        evict_if_expired(&mut map, key, now);

        match map.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::String(data) => Ok(Some(data.clone())),
                Value::List(_) => Err(StorageError::WrongType),
            },
        }
    }

    /// Escreve uma String. Em caso de sucesso instala uma Entry nova; o
    /// TTL anterior da chave é sempre descartado.
    pub fn set(
        &self,
        key: String,
        value: Bytes,
        options: &SetOptions,
    ) -> Result<SetOutcome, StorageError> {
        let now = self.now_ms();
        let expires_at = options.expiry.map(|e| e.deadline_ms(now));

        let mut map = self.lock();
        evict_if_expired(&mut map, &key, now);

        // GET exige que o valor anterior, se existir, seja String; a falha
        // de tipo aborta o SET inteiro antes de qualquer mutação
        let previous = match map.get(&key).map(|e| &e.value) {
            Some(Value::String(data)) => Some(data.clone()),
            Some(Value::List(_)) if options.get => return Err(StorageError::WrongType),
            _ => None,
        };

        let key_exists = map.contains_key(&key);
        match options.condition {
            Some(SetCondition::Nx) if key_exists => return Ok(SetOutcome::Skipped),
            Some(SetCondition::Xx) if !key_exists => return Ok(SetOutcome::Skipped),
            _ => {}
        }

        map.insert(key, Entry::new(Value::String(value), expires_at));

        if options.get {
            Ok(SetOutcome::AppliedGet(previous))
        } else {
            Ok(SetOutcome::Applied)
        }
    }

    /// Remove cada chave viva; chave ausente ou expirada contribui 0.
    pub fn del(&self, keys: &[String]) -> usize {
        let now = self.now_ms();
        let mut map = self.lock();

        let mut count = 0;
        for key in keys {
            evict_if_expired(&mut map, key, now);
            if map.remove(key).is_some() {
                count += 1;
            }
        }
        count
    }

    /// Conta quantas das chaves dadas existem. Duplicatas na entrada contam
    /// individualmente.
    pub fn exists(&self, keys: &[String]) -> usize {
        let now = self.now_ms();
        let mut map = self.lock();

        let mut count = 0;
        for key in keys {
            evict_if_expired(&mut map, key, now);
            if map.contains_key(key.as_str()) {
                count += 1;
            }
        }
        count
    }

    pub fn incr(&self, key: &str) -> Result<i64, StorageError> {
        self.incr_by(key, 1)
    }

    pub fn decr(&self, key: &str) -> Result<i64, StorageError> {
        self.incr_by(key, -1)
    }

    /// Incremento atômico. Chave ausente conta como "0". Mutação de valor,
    /// não Entry nova: o TTL existente é preservado.
    pub fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        let now = self.now_ms();
        let mut map = self.lock();
        evict_if_expired(&mut map, key, now);

        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::String(Bytes::from_static(b"0")), None));

        match &mut entry.value {
            Value::String(data) => {
                let current = std::str::from_utf8(data)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or(StorageError::NotAnInteger)?;
                let updated = current
                    .checked_add(delta)
                    .ok_or(StorageError::NotAnInteger)?;
                *data = Bytes::from(updated.to_string());
                Ok(updated)
            }
            Value::List(_) => Err(StorageError::WrongType),
        }
    }

    // --- Operações de lista ---

    /// Push na lista, pelo lado indicado. Chave ausente vira lista vazia
    /// (sem TTL) antes da inserção. Chave String falha com WrongType mesmo
    /// com zero valores.
    pub fn push(&self, key: &str, values: &[Bytes], side: Side) -> Result<usize, StorageError> {
        let now = self.now_ms();
        let mut map = self.lock();
        evict_if_expired(&mut map, key, now);

        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::List(VecDeque::new()), None));

        match &mut entry.value {
            Value::List(list) => {
                for v in values {
                    match side {
                        Side::Left => list.push_front(v.clone()),
                        Side::Right => list.push_back(v.clone()),
                    }
                }
                Ok(list.len())
            }
            Value::String(_) => Err(StorageError::WrongType),
        }
    }

    /// Slice inclusivo [start, stop] da lista, com índices negativos
    /// contando do fim. Índices fora dos limites saturam no limite mais
    /// próximo; start > stop ou lista vazia resultam em vazio.
    pub fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>, StorageError> {
        let now = self.now_ms();
        let mut map = self.lock();
        evict_if_expired(&mut map, key, now);

        let Some(entry) = map.get(key) else {
            return Ok(Vec::new());
        };

        match &entry.value {
            Value::List(list) => {
                let len = list.len() as i64;
                let from = if start < 0 {
                    (len + start).max(0)
                } else {
                    start.min(len)
                };
                let to = if stop < 0 { len + stop } else { stop.min(len - 1) };

                if list.is_empty() || to < 0 || from > to {
                    return Ok(Vec::new());
                }
                Ok(list.range(from as usize..=to as usize).cloned().collect())
            }
            Value::String(_) => Err(StorageError::WrongType),
        }
    }

    // --- Administração ---

    /// Esvazia o keyspace inteiro (FLUSHDB).
    pub fn flush(&self) {
        self.lock().clear();
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

/// Passo explícito de expiração lazy: remove a entrada se o deadline já
/// passou. Toda operação chama isto antes de olhar a chave, então nenhum
/// comando enxerga ou age sobre um valor expirado.
fn evict_if_expired(map: &mut HashMap<String, Entry>, key: &str, now_ms: u64) {
    if map.get(key).is_some_and(|e| e.is_expired(now_ms)) {
        map.remove(key);
        debug!("chave expirada removida (lazy): {key}");
    }
}
