//! # Erros do Crate
//!
//! Três famílias de falha convivem aqui:
//! - **Configuração**: descritor malformado, nome de codec/gerador desconhecido,
//!   recurso ausente ou de tipo errado. Detectadas na construção da fábrica.
//! - **Stream**: falhas de E/S ao ler amostras. O stream é sempre fechado antes
//!   do erro subir.
//! - **Invariantes**: spans inválidos, transições ilegais, tamanhos divergentes.
//!   São erros de programação ou de dados e nunca são corrigidos silenciosamente.

use thiserror::Error;

use crate::codec::CodecError;

/// Erros que podem ocorrer no pipeline de rotulagem de sequências.
#[derive(Debug, Error)]
pub enum SeqError {
    /// O descritor ou os parâmetros de treino são inválidos.
    #[error("configuração inválida: {0}")]
    InvalidConfiguration(String),

    /// Nenhum codec registrado com este nome.
    #[error("codec desconhecido: {0:?}")]
    UnknownCodec(String),

    /// Nenhum gerador de features registrado com este tipo.
    #[error("gerador de features desconhecido: {0:?}")]
    UnknownGenerator(String),

    /// O descritor referencia um recurso que não foi fornecido.
    #[error("recurso ausente: {0:?}")]
    MissingResource(String),

    /// O recurso existe mas não oferece a capacidade esperada.
    #[error("o recurso {name:?} não é um {expected}")]
    ResourceMismatch {
        /// Nome do recurso no mapa.
        name: String,
        /// Capacidade que o gerador esperava.
        expected: &'static str,
    },

    /// Parâmetro de gerador ausente ou com valor ilegível.
    #[error("parâmetro {key:?} do gerador {generator:?} inválido: {reason}")]
    InvalidParameter {
        generator: String,
        key: String,
        reason: String,
    },

    /// Falha de codificação/decodificação de spans.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Amostra que viola as invariantes de tamanho ou de span.
    #[error("amostra malformada: {0}")]
    MalformedSample(String),

    /// A busca em feixe não encontrou nenhuma sequência de rótulos válida.
    #[error("nenhuma sequência válida a partir do token {index}")]
    NoValidSequence { index: usize },

    /// Falha de E/S no stream de amostras.
    #[error("erro de E/S no stream de amostras: {0}")]
    Io(#[from] std::io::Error),

    /// O pipeline de features já foi construído com sucesso uma vez e falhou
    /// ao ser reconstruído. Indica defeito de programação, não entrada ruim.
    #[error("falha inesperada ao recriar o pipeline de features: {0}")]
    GeneratorRecreation(Box<SeqError>),

    /// Validação cruzada exige ao menos dois folds.
    #[error("número de folds inválido: {0} (mínimo 2)")]
    InvalidFolds(usize),

    /// Menos amostras do que folds.
    #[error("{samples} amostras não bastam para {folds} folds")]
    NotEnoughSamples { samples: usize, folds: usize },

    /// O algoritmo de aprendizado externo falhou.
    #[error("falha no treinamento: {0}")]
    Training(String),
}

/// Alias de `Result` para as operações do crate.
pub type Result<T> = std::result::Result<T, SeqError>;
