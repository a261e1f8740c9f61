//! cellpruneのシナリオテスト群
//!
//! 文法の導出と左分解、分類器の学習と保存を、
//! 小さなリソースファイルを使って通しで検証します。

mod classifier;
