//! # Amostras Anotadas e Streams de Amostras
//!
//! Uma [`Sample`] é uma sentença já tokenizada com suas entidades anotadas como
//! [`Span`]s (intervalos semiabertos de tokens). Amostras chegam por um
//! [`SampleStream`], uma fonte preguiçosa, finita e de passada única.
//!
//! ## Exemplo
//! Em "John Smith works in Paris":
//! - `Span { start: 0, end: 2, label: Some("PERSON") }` cobre "John Smith"
//! - `Span { start: 4, end: 5, label: Some("LOCATION") }` cobre "Paris"

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqError};

/// Tipo usado quando um span não traz rótulo próprio.
pub const DEFAULT_TYPE: &str = "default";

/// Intervalo `[start, end)` de tokens com um tipo opcional.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Índice do token inicial (inclusivo)
    pub start: usize,
    /// Índice do token final (exclusivo)
    pub end: usize,
    /// Tipo da entidade (ex: "PERSON"); `None` usa o tipo padrão do chamador
    #[serde(default, rename = "type")]
    pub label: Option<String>,
}

impl Span {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: Some(label.into()),
        }
    }

    /// Span sem tipo.
    pub fn untyped(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            label: None,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verdadeiro quando os dois spans compartilham ao menos um token.
    pub fn intersects(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Tipo efetivo, caindo para `default_type` quando o span não tem rótulo.
    pub fn label_or<'a>(&'a self, default_type: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(default_type)
    }
}

/// Forma serializada de uma amostra, validada na conversão para [`Sample`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SampleRecord {
    tokens: Vec<String>,
    #[serde(default)]
    spans: Vec<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    additional_context: Option<Vec<Vec<String>>>,
    #[serde(default)]
    clear_adaptive_data: bool,
}

/// Uma sentença anotada, pronta para virar eventos de treino.
///
/// Imutável depois de construída: as invariantes (spans dentro dos limites,
/// contexto adicional alinhado aos tokens) são checadas uma única vez em
/// [`Sample::new`] e [`Sample::with_additional_context`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SampleRecord", into = "SampleRecord")]
pub struct Sample {
    tokens: Vec<String>,
    spans: Vec<Span>,
    additional_context: Option<Vec<Vec<String>>>,
    clear_adaptive_data: bool,
}

impl Sample {
    /// Cria uma amostra, rejeitando spans vazios, fora da sentença ou com tipo vazio.
    pub fn new(tokens: Vec<String>, spans: Vec<Span>, clear_adaptive_data: bool) -> Result<Self> {
        for span in &spans {
            if span.start >= span.end || span.end > tokens.len() {
                return Err(SeqError::MalformedSample(format!(
                    "span [{}, {}) inválido para {} tokens",
                    span.start,
                    span.end,
                    tokens.len()
                )));
            }
            if span.label.as_deref() == Some("") {
                return Err(SeqError::MalformedSample(format!(
                    "span [{}, {}) com tipo vazio",
                    span.start, span.end
                )));
            }
        }
        Ok(Self {
            tokens,
            spans,
            additional_context: None,
            clear_adaptive_data,
        })
    }

    /// Anexa o contexto adicional por token (ex: decisões anteriores).
    pub fn with_additional_context(mut self, context: Vec<Vec<String>>) -> Result<Self> {
        if context.len() != self.tokens.len() {
            return Err(SeqError::MalformedSample(format!(
                "contexto adicional com {} entradas para {} tokens",
                context.len(),
                self.tokens.len()
            )));
        }
        self.additional_context = Some(context);
        Ok(self)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn additional_context(&self) -> Option<&[Vec<String>]> {
        self.additional_context.as_deref()
    }

    /// Indica que o estado adaptativo deve ser limpo antes desta amostra
    /// (tipicamente o início de um novo documento).
    pub fn clear_adaptive_data(&self) -> bool {
        self.clear_adaptive_data
    }

    /// Cópia da amostra mantendo apenas os spans aceitos por `keep`.
    pub fn retain_spans(&self, mut keep: impl FnMut(&Span) -> bool) -> Sample {
        Sample {
            tokens: self.tokens.clone(),
            spans: self.spans.iter().filter(|s| keep(s)).cloned().collect(),
            additional_context: self.additional_context.clone(),
            clear_adaptive_data: self.clear_adaptive_data,
        }
    }
}

impl TryFrom<SampleRecord> for Sample {
    type Error = SeqError;

    fn try_from(record: SampleRecord) -> Result<Self> {
        let sample = Sample::new(record.tokens, record.spans, record.clear_adaptive_data)?;
        match record.additional_context {
            Some(context) => sample.with_additional_context(context),
            None => Ok(sample),
        }
    }
}

impl From<Sample> for SampleRecord {
    fn from(sample: Sample) -> Self {
        SampleRecord {
            tokens: sample.tokens,
            spans: sample.spans,
            additional_context: sample.additional_context,
            clear_adaptive_data: sample.clear_adaptive_data,
        }
    }
}

/// Fonte de amostras de passada única (leitor de corpus, arquivo, memória...).
///
/// `read` devolve `Ok(None)` ao fim do stream. `close` libera os recursos
/// subjacentes e deve ser chamado mesmo quando a leitura falha.
pub trait SampleStream {
    fn read(&mut self) -> Result<Option<Sample>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: SampleStream + ?Sized> SampleStream for Box<S> {
    fn read(&mut self) -> Result<Option<Sample>> {
        (**self).read()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Stream sobre amostras já carregadas em memória.
#[derive(Debug)]
pub struct VecSampleStream {
    samples: std::vec::IntoIter<Sample>,
}

impl VecSampleStream {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples: samples.into_iter(),
        }
    }
}

impl SampleStream for VecSampleStream {
    fn read(&mut self) -> Result<Option<Sample>> {
        Ok(self.samples.next())
    }
}

/// Filtro que deixa passar apenas spans de tipos selecionados.
///
/// Spans sem tipo são descartados. As amostras em si nunca são removidas: uma
/// sentença sem entidades dos tipos escolhidos continua sendo exemplo negativo.
pub struct SampleTypeFilter<S> {
    inner: S,
    types: HashSet<String>,
}

impl<S: SampleStream> SampleTypeFilter<S> {
    pub fn new<I, T>(types: I, inner: S) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            inner,
            types: types.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: SampleStream> SampleStream for SampleTypeFilter<S> {
    fn read(&mut self) -> Result<Option<Sample>> {
        let types = &self.types;
        Ok(self.inner.read()?.map(|sample| {
            sample.retain_spans(|span| {
                span.label
                    .as_deref()
                    .is_some_and(|label| types.contains(label))
            })
        }))
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

/// Lê o stream inteiro e o fecha, com sucesso ou não.
///
/// Um erro de leitura tem precedência sobre um erro de fechamento.
pub fn read_all<S: SampleStream + ?Sized>(stream: &mut S) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    let read = loop {
        match stream.read() {
            Ok(Some(sample)) => samples.push(sample),
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };
    let closed = stream.close();
    read?;
    closed?;
    Ok(samples)
}

#[cfg(test)]
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
