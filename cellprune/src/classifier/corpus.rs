//! 抽出済み素性コーパスのモジュール。

use std::io::{BufRead, BufReader, Read};
use std::ops::Deref;

use crate::classifier::{FeatureExtractor, Labeled};
use crate::errors::{CellpruneError, Result};
use crate::perceptron::FeatureVector;

/// 1文分の正解と素性ベクトル。
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureSentence {
    golds: Vec<u32>,
    vectors: Vec<FeatureVector>,
}

impl FeatureSentence {
    /// 位置ごとの素性ベクトルを返します。
    pub fn vectors(&self) -> &[FeatureVector] {
        &self.vectors
    }
}

impl Labeled for FeatureSentence {
    fn num_positions(&self) -> usize {
        self.golds.len()
    }

    fn gold(&self, position: usize) -> u32 {
        self.golds[position]
    }
}

/// [`FeatureCorpus`] の素性ベクトルをそのまま返す素性抽出器。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusExtractor {
    vector_length: usize,
    template_count: usize,
    template: String,
}

impl FeatureExtractor<FeatureSentence> for CorpusExtractor {
    fn vector_length(&self) -> usize {
        self.vector_length
    }

    fn template_count(&self) -> usize {
        self.template_count
    }

    fn template(&self) -> &str {
        &self.template
    }

    fn feature_vector(&self, instance: &FeatureSentence, position: usize) -> FeatureVector {
        instance.vectors[position].clone()
    }
}

/// 素性抽出済みのコーパス。
///
/// 各行は `正解<TAB>素性 素性 ...` の形式で、文の終わりに `EOS` が置かれます。
/// 素性は `インデックス` または `インデックス:値` です。
/// 先頭の `#` で始まる行はヘッダで、`# numFeats=<n>` と `# template=<記述>` を指定できます。
///
/// ```text
/// # numFeats=6
/// # template=bias w0 w1
/// 3	0 2 5
/// 1	0 1:0.5
/// EOS
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureCorpus {
    extractor: CorpusExtractor,
    sentences: Vec<FeatureSentence>,
}

struct PendingSentence {
    golds: Vec<u32>,
    pairs: Vec<Vec<(usize, f32)>>,
}

fn parse_feature(token: &str) -> Result<(usize, f32)> {
    match token.split_once(':') {
        Some((i, v)) => Ok((i.parse()?, v.parse()?)),
        None => Ok((token.parse()?, 1.0)),
    }
}

impl FeatureCorpus {
    /// コーパスを読み込みます。
    ///
    /// 素性空間の大きさは `numFeats` ヘッダ、なければ最大のインデックス + 1 です。
    ///
    /// # エラー
    ///
    /// 入力形式が不正な場合、[`CellpruneError`] が返されます。
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        Self::read(rdr, None)
    }

    /// 素性空間の大きさを指定してコーパスを読み込みます。
    ///
    /// 範囲外のインデックスを持つ素性は、学習時に観測されなかった素性として読み捨てます。
    /// 評価用のコーパスを学習済みモデルに合わせるために使用します。
    ///
    /// # エラー
    ///
    /// 入力形式が不正な場合、[`CellpruneError`] が返されます。
    pub fn from_reader_with_length<R>(rdr: R, vector_length: usize) -> Result<Self>
    where
        R: Read,
    {
        Self::read(rdr, Some(vector_length))
    }

    fn read<R>(rdr: R, forced_length: Option<usize>) -> Result<Self>
    where
        R: Read,
    {
        let buf = BufReader::new(rdr);

        let mut declared_length = None;
        let mut template = String::new();
        let mut pending = vec![];
        let mut golds = vec![];
        let mut pairs = vec![];
        let mut max_index = None;

        for line in buf.lines() {
            let line = line?;
            if let Some(header) = line.strip_prefix('#') {
                let header = header.trim();
                if let Some(n) = header.strip_prefix("numFeats=") {
                    declared_length = Some(n.parse::<usize>()?);
                } else if let Some(t) = header.strip_prefix("template=") {
                    template = t.to_string();
                }
                continue;
            }
            if line == "EOS" {
                if !golds.is_empty() {
                    pending.push(PendingSentence {
                        golds: std::mem::take(&mut golds),
                        pairs: std::mem::take(&mut pairs),
                    });
                }
                continue;
            }
            let Some((gold, features)) = line.split_once('\t') else {
                return Err(CellpruneError::invalid_format(
                    "rdr",
                    "Each line must be a pair of a gold value and features or `EOS`",
                ));
            };
            let features = features
                .split_whitespace()
                .map(parse_feature)
                .collect::<Result<Vec<_>>>()?;
            if let Some(m) = features.iter().map(|&(i, _)| i).max() {
                max_index = max_index.max(Some(m));
            }
            golds.push(gold.trim().parse()?);
            pairs.push(features);
        }
        if !golds.is_empty() {
            return Err(CellpruneError::invalid_format(
                "rdr",
                "the last sentence is not terminated by `EOS`",
            ));
        }

        let inferred_length = max_index.map_or(0, |m| m + 1);
        let vector_length = match (forced_length, declared_length) {
            (Some(n), _) => n,
            (None, Some(n)) if n < inferred_length => {
                return Err(CellpruneError::invalid_format(
                    "rdr",
                    format!("feature index {} exceeds numFeats={n}", inferred_length - 1),
                ));
            }
            (None, Some(n)) => n,
            (None, None) => inferred_length,
        };

        let mut num_dropped = 0;
        let mut template_count = 0;
        let mut sentences = Vec::with_capacity(pending.len());
        for PendingSentence { golds, pairs } in pending {
            let mut vectors = Vec::with_capacity(pairs.len());
            for mut features in pairs {
                let before = features.len();
                features.retain(|&(i, _)| i < vector_length);
                num_dropped += before - features.len();
                template_count = template_count.max(features.len());
                vectors.push(FeatureVector::from_pairs(vector_length, features)?);
            }
            sentences.push(FeatureSentence { golds, vectors });
        }
        if num_dropped != 0 {
            log::warn!("dropped {num_dropped} features outside of the model's {vector_length} features");
        }

        Ok(Self {
            extractor: CorpusExtractor {
                vector_length,
                template_count,
                template,
            },
            sentences,
        })
    }

    /// 素性空間の大きさを返します。
    pub fn vector_length(&self) -> usize {
        self.extractor.vector_length
    }

    /// 素性テンプレートの記述を返します。
    pub fn template(&self) -> &str {
        &self.extractor.template
    }

    /// 文のスライスを返します。
    pub fn sentences(&self) -> &[FeatureSentence] {
        &self.sentences
    }

    /// すべての文の位置の総数を返します。
    pub fn num_positions(&self) -> usize {
        self.sentences.iter().map(Labeled::num_positions).sum()
    }

    /// このコーパスの素性ベクトルを返す素性抽出器を返します。
    pub fn extractor(&self) -> CorpusExtractor {
        self.extractor.clone()
    }
}

impl Deref for FeatureCorpus {
    type Target = [FeatureSentence];

    fn deref(&self) -> &Self::Target {
        &self.sentences
    }
}
