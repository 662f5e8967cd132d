//! # ner-seq — Rotulagem de Sequências para NER
//!
//! Este crate prepara e avalia modelos de rotulagem token a token (estilo
//! reconhecimento de entidades nomeadas): converte amostras anotadas com spans
//! em decisões por token, monta o contexto de features de cada token e roda
//! validação cruzada k-fold sobre uma configuração de features.
//!
//! ## Fluxo de Dados
//!
//! 1.  **Amostras** ([`sample`]): tokens + spans + contexto adicional opcional.
//! 2.  **Codec** ([`codec`]): spans → um rótulo por token (BIO ou BILOU), e de volta.
//! 3.  **Features** ([`features`], [`context`]): cada posição vira um conjunto de strings.
//! 4.  **Eventos** ([`event_stream`]): pares `(rótulo, contexto)` para o aprendizado.
//! 5.  **Aprendizado** ([`model`], [`perceptron`]): algoritmo plugável sobre eventos.
//! 6.  **Predição** ([`labeler`]): busca em feixe guiada pelo validador do codec.
//! 7.  **Avaliação** ([`eval`], [`cross_validation`]): precisão, cobertura e F1 por fold.
//!
//! A [`factory`] reconstrói codec e geradores a partir de um [`descriptor`]
//! serializável, resolvendo nomes pelo [`registry`].
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use ner_seq::{BioCodec, SequenceCodec, Span};
//!
//! let tokens = ["John", "Smith", "works", "in", "Paris"];
//! let spans = vec![Span::new(0, 2, "PERSON"), Span::new(4, 5, "LOCATION")];
//!
//! let outcomes = BioCodec.encode(&spans, tokens.len(), "default").unwrap();
//! assert_eq!(
//!     outcomes,
//!     ["PERSON-START", "PERSON-CONTINUE", "OTHER", "OTHER", "LOCATION-START"]
//! );
//! assert_eq!(BioCodec.decode(&outcomes).unwrap(), spans);
//! ```

pub mod codec;
pub mod context;
pub mod cross_validation;
pub mod descriptor;
pub mod error;
pub mod eval;
pub mod event_stream;
pub mod factory;
pub mod features;
pub mod labeler;
pub mod model;
pub mod overlap;
pub mod perceptron;
pub mod registry;
pub mod resources;
pub mod sample;

pub use codec::{
    BilouCodec, BilouValidator, BioCodec, BioValidator, CodecError, Outcome, SequenceCodec,
    SequenceValidator, TagRole, OTHER,
};
pub use context::ContextGenerator;
pub use cross_validation::{CrossValidationReport, CrossValidator, FoldPartition, ValidationState};
pub use descriptor::{FeatureDescriptor, GeneratorSpec};
pub use error::{Result, SeqError};
pub use eval::{
    DetailedFMeasureListener, ErrorListener, EvaluationMonitor, FMeasure, SequenceLabelerEvaluator,
};
pub use event_stream::{additional_context, Event, EventStream};
pub use factory::SequenceLabelerFactory;
pub use features::{FeatureGenerator, Sentence};
pub use labeler::SequenceLabeler;
pub use model::{EventModel, EventTrainer, TrainingParameters};
pub use overlap::{drop_overlapping_spans, PreferLongest, PreferPrimary, SpanConflictResolver};
pub use perceptron::{PerceptronModel, PerceptronTrainer};
pub use registry::{BuildContext, Registry};
pub use resources::{Resource, Resources, SequenceTagger};
pub use sample::{
    read_all, Sample, SampleStream, SampleTypeFilter, Span, VecSampleStream, DEFAULT_TYPE,
};
