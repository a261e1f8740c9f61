//! 括弧表記の構文木のモジュール。
//!
//! 木構造コーパスは1行1文の括弧表記 `(TOP (S (NP (NNP Wnnp)) (VP Wvp)))` で与えられます。
//! このモジュールはその解析と出力、および左分解（二分化）とその逆変換を提供します。

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{CellpruneError, Result};

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(|\)|[^\s()]+").unwrap());

/// 左分解で導入される合成カテゴリの区切り文字
pub const FACTOR_SEPARATOR: char = '-';

/// 構文木のノード。
///
/// 子を持たないノードは終端記号（単語）を表します。
/// Penn Treebank 形式の `( (S ...) )` のようにラベルのない根は、空のラベルを持つノードになります。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree {
    label: String,
    children: Vec<Tree>,
}

impl Tree {
    /// 子を持つノードを作成します。
    pub fn new<S>(label: S, children: Vec<Tree>) -> Self
    where
        S: Into<String>,
    {
        Self {
            label: label.into(),
            children,
        }
    }

    /// 終端ノードを作成します。
    pub fn leaf<S>(label: S) -> Self
    where
        S: Into<String>,
    {
        Self::new(label, vec![])
    }

    /// ノードのラベルを返します。
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 子ノードのスライスを返します。
    pub fn children(&self) -> &[Tree] {
        &self.children
    }

    /// 終端ノードであれば `true` を返します。
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// 終端記号を左から順に返します。
    pub fn leaves(&self) -> Vec<&str> {
        let mut leaves = vec![];
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a str>) {
        if self.is_leaf() {
            leaves.push(&self.label);
        } else {
            for child in &self.children {
                child.collect_leaves(leaves);
            }
        }
    }

    /// 3つ以上の子を持つノードを、合成カテゴリを導入して二分木に変換します。
    ///
    /// `(NP a b c d)` は `(NP a (NP-a b (NP-a-b c d)))` になります。
    /// 合成カテゴリの名前は、親カテゴリにそれまでに消費した子のラベルを
    /// [`FACTOR_SEPARATOR`] で連結したものです。
    pub fn left_factor(&self) -> Self {
        if self.is_leaf() {
            return self.clone();
        }
        let children = self.children.iter().map(Self::left_factor).collect();
        Self::factor_chain(self.label.clone(), children)
    }

    fn factor_chain(label: String, mut children: Vec<Tree>) -> Self {
        if children.len() <= 2 {
            return Self { label, children };
        }
        let first = children.remove(0);
        let synthetic = format!("{label}{FACTOR_SEPARATOR}{}", first.label);
        let rest = Self::factor_chain(synthetic, children);
        Self {
            label,
            children: vec![first, rest],
        }
    }

    /// 左分解の逆変換です。
    ///
    /// `is_synthetic` が `true` を返す非終端ノードを取り除き、その子を親に直接つなぎ直します。
    /// 根ノードは取り除かれません。
    pub fn unfactor<F>(&self, is_synthetic: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        self.unfactor_with(&is_synthetic)
    }

    fn unfactor_with<F>(&self, is_synthetic: &F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let mut children = vec![];
        for child in &self.children {
            let child = child.unfactor_with(is_synthetic);
            if !child.is_leaf() && is_synthetic(&child.label) {
                children.extend(child.children);
            } else {
                children.push(child);
            }
        }
        Self {
            label: self.label.clone(),
            children,
        }
    }
}

/// Penn Treebank 形式のタグセットを前提とした合成カテゴリの判定です。
///
/// ハイフンを含むラベルを合成カテゴリとみなします。ただし `IN-` または `W` で始まるものは除きます。
/// 出自の分からない木にのみ使用してください。
/// [`FactoredGrammar`](crate::grammar::FactoredGrammar) が生成したカテゴリは、
/// そちらの記録を使う方が確実です。
pub fn penn_synthetic_label(label: &str) -> bool {
    label.contains(FACTOR_SEPARATOR) && !label.starts_with("IN-") && !label.starts_with('W')
}

impl FromStr for Tree {
    type Err = CellpruneError;

    fn from_str(s: &str) -> Result<Self> {
        let mut stack: Vec<Tree> = vec![];
        let mut root = None;
        let mut expect_label = false;

        for m in TOKEN_PATTERN.find_iter(s) {
            if root.is_some() {
                return Err(CellpruneError::invalid_format(
                    "tree",
                    "trailing tokens after the root constituent",
                ));
            }
            match m.as_str() {
                "(" => {
                    stack.push(Tree::leaf(""));
                    expect_label = true;
                }
                ")" => {
                    expect_label = false;
                    let node = stack.pop().ok_or_else(|| {
                        CellpruneError::invalid_format("tree", "unbalanced closing bracket")
                    })?;
                    // PTB style `( (S ...) )` wraps the root in an unlabeled bracket.
                    if node.label.is_empty() && !(stack.is_empty() && node.children.len() == 1) {
                        return Err(CellpruneError::invalid_format(
                            "tree",
                            "constituent without a label",
                        ));
                    }
                    if node.children.is_empty() {
                        return Err(CellpruneError::invalid_format(
                            "tree",
                            format!("constituent `{}` has no children", node.label),
                        ));
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
                token => match stack.last_mut() {
                    Some(node) if expect_label => {
                        node.label = token.to_string();
                        expect_label = false;
                    }
                    Some(node) => node.children.push(Tree::leaf(token)),
                    None => {
                        return Err(CellpruneError::invalid_format(
                            "tree",
                            format!("token `{token}` outside of brackets"),
                        ));
                    }
                },
            }
        }

        if !stack.is_empty() {
            return Err(CellpruneError::invalid_format(
                "tree",
                "unbalanced opening bracket",
            ));
        }
        root.ok_or_else(|| CellpruneError::invalid_format("tree", "empty input"))
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_leaf() {
            return write!(f, "{}", self.label);
        }
        write!(f, "({}", self.label)?;
        for child in &self.children {
            write!(f, " {child}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let src = "(TOP (S (NP (NNP Wnnp)) (VP Wvp)))";
        let tree: Tree = src.parse().unwrap();

        assert_eq!("TOP", tree.label());
        assert_eq!(1, tree.children().len());
        assert_eq!(vec!["Wnnp", "Wvp"], tree.leaves());
        assert_eq!(src, tree.to_string());
    }

    #[test]
    fn test_parse_unlabeled_root() {
        let tree: Tree = "( (S (NN dog) (VB runs)) )".parse().unwrap();
        assert_eq!("", tree.label());
        assert_eq!("S", tree.children()[0].label());
        assert_eq!(vec!["dog", "runs"], tree.leaves());
        assert_eq!("( (S (NN dog) (VB runs)))", tree.to_string());

        assert!("( (NN a) (NN b) )".parse::<Tree>().is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Tree>().is_err());
        assert!("(NP (NN a)".parse::<Tree>().is_err());
        assert!("(NP (NN a)))".parse::<Tree>().is_err());
        assert!("(NP (NN a)) (VP b)".parse::<Tree>().is_err());
        assert!("(NP)".parse::<Tree>().is_err());
        assert!("word".parse::<Tree>().is_err());
        assert!("(NP ((NN a)))".parse::<Tree>().is_err());
    }

    #[test]
    fn test_left_factor() {
        let tree: Tree = "(NP (NNP Wnnp) (NNP Wnnp) (NNPS Wnnps) (NNP Wnnp))"
            .parse()
            .unwrap();
        let factored = tree.left_factor();
        assert_eq!(
            "(NP (NNP Wnnp) (NP-NNP (NNP Wnnp) (NP-NNP-NNP (NNPS Wnnps) (NNP Wnnp))))",
            factored.to_string()
        );
        assert_eq!(tree.leaves(), factored.leaves());
    }

    #[test]
    fn test_unfactor_restores_tree() {
        let tree: Tree = "(TOP (S (NP (DT the) (JJ big) (JJ red) (NN dog)) (VP (VBD ran) (RB away) (RB fast))))"
            .parse()
            .unwrap();
        let factored = tree.left_factor();
        assert_ne!(tree, factored);

        let restored = factored.unfactor(|label| label.contains(FACTOR_SEPARATOR));
        assert_eq!(tree, restored);
        assert_eq!(tree.leaves(), restored.leaves());
    }

    #[test]
    fn test_penn_synthetic_label() {
        assert!(penn_synthetic_label("NP-NNP"));
        assert!(!penn_synthetic_label("NP"));
        assert!(!penn_synthetic_label("IN-of"));
        assert!(!penn_synthetic_label("WHNP-1"));
    }
}
