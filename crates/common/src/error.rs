/// Erros de enquadramento do protocolo RESP.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("byte de tipo inválido: {0:#x}")]
    InvalidFrameType(u8),
    #[error("inteiro inválido: {0}")]
    InvalidInteger(String),
    #[error("comprimento de bulk inválido: {0}")]
    InvalidBulkLength(i64),
    #[error("frame excede tamanho máximo ({0} bytes)")]
    FrameTooLarge(usize),
    #[error("encoding inválido: {0}")]
    InvalidEncoding(String),
}

/// Erros do engine de armazenamento.
///
/// Nenhuma operação que falha com esses erros muda o keyspace: a validação
/// acontece antes de qualquer mutação.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A chave existe mas guarda a variante errada (String vs List).
    #[error("operação contra chave com tipo errado")]
    WrongType,
    /// O valor armazenado não é um inteiro decimal de 64 bits.
    #[error("valor não é um inteiro válido ou está fora do intervalo")]
    NotAnInteger,
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("servidor em shutdown")]
    Shutdown,
}

/// Erros de parsing/validação de comandos.
///
/// As mensagens seguem o texto canônico do Redis porque chegam ao cliente
/// via frame de erro (`ERR <mensagem>`).
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Nenhum comando foi parseado (array vazio do cliente).
    #[error("Protocol error: empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(String),
    /// Opção desconhecida, NX+XX juntos, TTL não numérico, etc.
    #[error("syntax error")]
    Syntax,
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}

/// Erro top-level do Faísca.
#[derive(Debug, thiserror::Error)]
pub enum FaiscaError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result type alias.
pub type FaiscaResult<T> = Result<T, FaiscaError>;

// Conversão implícita de io::Error → FaiscaError (via ConnectionError)
impl From<std::io::Error> for FaiscaError {
    fn from(e: std::io::Error) -> Self {
        FaiscaError::Connection(ConnectionError::Io(e))
    }
}
