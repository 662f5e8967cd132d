//! Leitura de amostras em JSON lines: uma amostra por linha.
//!
//! ```json
//! {"tokens": ["John", "Smith"], "spans": [{"start": 0, "end": 2, "type": "PER"}], "clear_adaptive_data": true}
//! ```

use std::io::{self, BufRead, Lines};

use ner_seq::{Result, Sample, SampleStream, SeqError};

pub struct JsonLinesSampleStream<R> {
    lines: Option<Lines<R>>,
    line: usize,
}

impl<R: BufRead> JsonLinesSampleStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: Some(reader.lines()),
            line: 0,
        }
    }
}

impl<R: BufRead> SampleStream for JsonLinesSampleStream<R> {
    fn read(&mut self) -> Result<Option<Sample>> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        for line in lines {
            self.line += 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&line).map(Some).map_err(|e| {
                SeqError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("linha {}: {e}", self.line),
                ))
            });
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<()> {
        self.lines = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ner_seq::{read_all, Span};

    #[test]
    fn test_reads_samples_and_skips_blank_lines() {
        let input = r#"{"tokens": ["John", "Smith"], "spans": [{"start": 0, "end": 2, "type": "PER"}]}

{"tokens": ["Paris"], "spans": [], "clear_adaptive_data": true}
"#;
        let mut stream = JsonLinesSampleStream::new(input.as_bytes());
        let samples = read_all(&mut stream).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].spans(), [Span::new(0, 2, "PER")]);
        assert!(samples[1].clear_adaptive_data());
        assert!(stream.read().unwrap().is_none());
    }

    #[test]
    fn test_invalid_line_is_stream_error() {
        let input = "{\"tokens\": [\"a\"], \"spans\": []}\n{\"tokens\": [\"a\"], \"spans\": [{\"start\": 0, \"end\": 4}]}\n";
        let mut stream = JsonLinesSampleStream::new(input.as_bytes());
        assert!(stream.read().unwrap().is_some());
        let err = stream.read().unwrap_err();
        assert!(matches!(err, SeqError::Io(_)));
        assert!(err.to_string().contains("linha 2"));
    }
}
