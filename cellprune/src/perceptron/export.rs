//! パーセプトロンモデルのテキスト形式での入出力。
//!
//! ```text
//! numFeats=4 numClasses=2 bins=0,5 numTrainExamples=120
//! <素性テンプレート>
//! vector type=float length=4
//! 0.5 0 -1.25 0
//! vector type=float length=4 sparse=true
//! 1:0.75 3:-0.5
//! ```
//!
//! ヘッダ行には `bias=<値>` を追加できます。
//! 重みベクトルの本数がクラス数と異なる場合（二値分類では1本）は、
//! `numVectors=<本数>` が書き込まれます。省略時はクラス数と同じ本数です。

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use crate::errors::{CellpruneError, Result};
use crate::perceptron::{Bins, NumericVector};

/// テキスト形式で書き出されたモデルの内容。
#[derive(Clone, Debug, PartialEq)]
pub struct PerceptronExport {
    /// 素性空間の大きさ
    pub num_features: usize,
    /// クラス数
    pub num_classes: usize,
    /// クラスの離散化に使用したビン
    pub bins: Option<Bins>,
    /// 学習した事例の数
    pub num_train_examples: u64,
    /// 二値分類の判定バイアス
    pub bias: Option<f32>,
    /// 素性テンプレートの記述
    pub template: String,
    /// 重みベクトル
    pub vectors: Vec<NumericVector<f32>>,
}

fn format_error<S>(msg: S) -> CellpruneError
where
    S: Into<String>,
{
    CellpruneError::invalid_format("perceptron export", msg)
}

fn parse_header(line: &str) -> Result<BTreeMap<&str, &str>> {
    line.split_whitespace()
        .map(|kv| {
            kv.split_once('=')
                .ok_or_else(|| format_error(format!("expected key=value, got `{kv}`")))
        })
        .collect()
}

fn required<'a>(header: &BTreeMap<&str, &'a str>, key: &str) -> Result<&'a str> {
    header
        .get(key)
        .copied()
        .ok_or_else(|| format_error(format!("missing key `{key}`")))
}

impl PerceptronExport {
    /// テキスト形式で書き込みます。
    ///
    /// 疎な重みベクトルは `インデックス:値` の組で書き込まれます。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let mut wtr = BufWriter::new(wtr);
        write!(
            &mut wtr,
            "numFeats={} numClasses={} bins={} numTrainExamples={}",
            self.num_features,
            self.num_classes,
            self.bins.as_ref().map(Bins::to_string).unwrap_or_default(),
            self.num_train_examples,
        )?;
        if self.vectors.len() != self.num_classes {
            write!(&mut wtr, " numVectors={}", self.vectors.len())?;
        }
        if let Some(bias) = self.bias {
            write!(&mut wtr, " bias={bias}")?;
        }
        writeln!(&mut wtr)?;
        writeln!(&mut wtr, "{}", self.template)?;

        for vector in &self.vectors {
            if vector.is_sparse() {
                writeln!(&mut wtr, "vector type=float length={} sparse=true", vector.len())?;
                let pairs: Vec<String> = vector
                    .populated_indices()
                    .into_iter()
                    .map(|i| format!("{i}:{}", vector.get(i)))
                    .collect();
                writeln!(&mut wtr, "{}", pairs.join(" "))?;
            } else {
                writeln!(&mut wtr, "vector type=float length={}", vector.len())?;
                let values: Vec<String> =
                    (0..vector.len()).map(|i| vector.get(i).to_string()).collect();
                writeln!(&mut wtr, "{}", values.join(" "))?;
            }
        }
        wtr.flush()?;
        Ok(())
    }

    /// [`write()`](Self::write) で書き込まれたモデルを読み込みます。
    ///
    /// # エラー
    ///
    /// 形式が不正な場合、[`CellpruneError`] が返されます。
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut lines = BufReader::new(rdr).lines();
        let mut next_line = |what: &str| {
            lines
                .next()
                .transpose()?
                .ok_or_else(|| format_error(format!("unexpected end of input, expected {what}")))
        };

        let header_line = next_line("the header")?;
        let header = parse_header(&header_line)?;
        let num_features: usize = required(&header, "numFeats")?.parse()?;
        let num_classes: usize = required(&header, "numClasses")?.parse()?;
        let bins = match required(&header, "bins")? {
            "" => None,
            bins => Some(bins.parse()?),
        };
        let num_train_examples = required(&header, "numTrainExamples")?.parse()?;
        let bias = header.get("bias").map(|b| b.parse()).transpose()?;
        let num_vectors = match header.get("numVectors") {
            Some(n) => n.parse()?,
            None => num_classes,
        };

        let template = next_line("the template")?;

        let mut vectors = Vec::with_capacity(num_vectors);
        for _ in 0..num_vectors {
            let vector_line = next_line("a vector header")?;
            let vector_header = vector_line
                .strip_prefix("vector ")
                .ok_or_else(|| format_error(format!("expected a vector header, got `{vector_line}`")))?;
            let vector_header = parse_header(vector_header)?;
            if required(&vector_header, "type")? != "float" {
                return Err(format_error("only float vectors are supported"));
            }
            let length: usize = required(&vector_header, "length")?.parse()?;
            if length != num_features {
                return Err(CellpruneError::DimensionMismatch {
                    expected: num_features,
                    actual: length,
                });
            }
            let sparse = vector_header.get("sparse") == Some(&"true");

            let values = next_line("vector values")?;
            let vector = if sparse {
                let mut vector = NumericVector::sparse(length);
                for pair in values.split_whitespace() {
                    let (i, v) = pair
                        .split_once(':')
                        .ok_or_else(|| format_error(format!("expected index:value, got `{pair}`")))?;
                    let i: usize = i.parse()?;
                    if i >= length {
                        return Err(format_error(format!("index {i} is out of range")));
                    }
                    vector.set(i, v.parse()?);
                }
                vector
            } else {
                let values = values
                    .split_whitespace()
                    .map(str::parse)
                    .collect::<Result<Vec<f32>, _>>()?;
                if values.len() != length {
                    return Err(format_error(format!(
                        "expected {length} values, got {}",
                        values.len()
                    )));
                }
                NumericVector::Dense(values)
            };
            vectors.push(vector);
        }

        Ok(Self {
            num_features,
            num_classes,
            bins,
            num_train_examples,
            bias,
            template,
            vectors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_format() {
        let mut dense = NumericVector::dense(3);
        dense.set(0, 0.5);
        dense.set(2, -1.25);
        let export = PerceptronExport {
            num_features: 3,
            num_classes: 3,
            bins: Some("0,5".parse().unwrap()),
            num_train_examples: 12,
            bias: None,
            template: "w0 t-1".to_string(),
            vectors: vec![dense.clone(), NumericVector::dense(3), dense],
        };

        let mut buf = vec![];
        export.write(&mut buf).unwrap();
        assert_eq!(
            "numFeats=3 numClasses=3 bins=0,5 numTrainExamples=12\n\
             w0 t-1\n\
             vector type=float length=3\n\
             0.5 0 -1.25\n\
             vector type=float length=3\n\
             0 0 0\n\
             vector type=float length=3\n\
             0.5 0 -1.25\n",
            String::from_utf8(buf).unwrap()
        );
    }

    #[test]
    fn test_read_sparse_with_bias() {
        let text = "numFeats=4 numClasses=2 bins= numTrainExamples=7 bias=-0.5 numVectors=1\n\
                    \n\
                    vector type=float length=4 sparse=true\n\
                    1:0.75 3:-0.5\n";
        let export = PerceptronExport::read(text.as_bytes()).unwrap();

        assert_eq!(4, export.num_features);
        assert_eq!(2, export.num_classes);
        assert_eq!(1, export.vectors.len());
        assert_eq!(None, export.bins);
        assert_eq!(7, export.num_train_examples);
        assert_eq!(Some(-0.5), export.bias);
        assert_eq!("", export.template);
        assert!(export.vectors[0].is_sparse());
        assert_eq!(0.75, export.vectors[0].get(1));
        assert_eq!(-0.5, export.vectors[0].get(3));
        assert_eq!(0.0, export.vectors[0].get(0));

        let mut buf = vec![];
        export.write(&mut buf).unwrap();
        assert_eq!(export, PerceptronExport::read(buf.as_slice()).unwrap());
    }

    #[test]
    fn test_read_errors() {
        assert!(PerceptronExport::read("".as_bytes()).is_err());
        assert!(PerceptronExport::read("numFeats=2 numClasses=1 bins=\n\n".as_bytes()).is_err());
        let short = "numFeats=2 numClasses=1 bins= numTrainExamples=0\n\nvector type=float length=2\n1\n";
        assert!(PerceptronExport::read(short.as_bytes()).is_err());
        let mismatch = "numFeats=2 numClasses=1 bins= numTrainExamples=0\n\nvector type=float length=3\n1 2 3\n";
        assert!(matches!(
            PerceptronExport::read(mismatch.as_bytes()),
            Err(CellpruneError::DimensionMismatch { .. })
        ));
    }
}
