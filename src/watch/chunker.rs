//! Chunk a unified diff along file boundaries to fit a token budget.
//!
//! Tokens are estimated as `ceil(chars/4)`. A single file whose diff
//! exceeds the budget becomes its own chunk. Chunks are numbered 1..N
//! with per-file ordering preserved from the input diff.

use crate::utils::estimate_tokens;

/// One file's portion of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct DiffChunk {
    /// 1-based index.
    pub index: usize,
    pub files: Vec<FileDiff>,
    pub estimated_tokens: usize,
}

impl DiffChunk {
    pub fn content(&self) -> String {
        self.files.iter().map(|f| f.content.as_str()).collect()
    }
}

/// Split a unified diff into per-file segments on `diff --git` boundaries.
pub fn split_by_file(diff: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;

    for line in diff.split_inclusive('\n') {
        if line.starts_with("diff --git ") {
            if let Some(file) = current.take() {
                files.push(file);
            }
            current = Some(FileDiff { path: parse_git_path(line), content: String::new() });
        }
        if let Some(file) = current.as_mut() {
            file.content.push_str(line);
        }
    }
    if let Some(file) = current.take() {
        files.push(file);
    }
    files
}

/// `diff --git a/src/x.rs b/src/x.rs` → `src/x.rs` (the post-image side).
fn parse_git_path(header: &str) -> String {
    header
        .trim_end()
        .rsplit(' ')
        .next()
        .map(|b_side| b_side.trim_start_matches("b/").to_string())
        .unwrap_or_default()
}

/// Group file diffs into chunks honoring both budgets.
pub fn chunk_diff(diff: &str, max_tokens: usize, max_files_per_chunk: usize) -> Vec<DiffChunk> {
    let files = split_by_file(diff);
    let mut chunks: Vec<DiffChunk> = Vec::new();
    let mut current_files: Vec<FileDiff> = Vec::new();
    let mut current_tokens = 0usize;

    let flush = |files: &mut Vec<FileDiff>, tokens: &mut usize, chunks: &mut Vec<DiffChunk>| {
        if !files.is_empty() {
            chunks.push(DiffChunk {
                index: chunks.len() + 1,
                files: std::mem::take(files),
                estimated_tokens: *tokens,
            });
            *tokens = 0;
        }
    };

    for file in files {
        let file_tokens = estimate_tokens(&file.content);

        // Oversize file: flush what we have, then emit it alone.
        if file_tokens > max_tokens {
            flush(&mut current_files, &mut current_tokens, &mut chunks);
            chunks.push(DiffChunk {
                index: chunks.len() + 1,
                files: vec![file],
                estimated_tokens: file_tokens,
            });
            continue;
        }

        let over_tokens = current_tokens + file_tokens > max_tokens;
        let over_files = current_files.len() >= max_files_per_chunk;
        if !current_files.is_empty() && (over_tokens || over_files) {
            flush(&mut current_files, &mut current_tokens, &mut chunks);
        }
        current_tokens += file_tokens;
        current_files.push(file);
    }
    flush(&mut current_files, &mut current_tokens, &mut chunks);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_diff(path: &str, body_lines: usize) -> String {
        let mut out = format!("diff --git a/{path} b/{path}\n--- a/{path}\n+++ b/{path}\n");
        for i in 0..body_lines {
            out.push_str(&format!("+line {i} of synthetic change content\n"));
        }
        out
    }

    #[test]
    fn split_recovers_paths_and_reconstructs_input() {
        let diff = format!("{}{}", file_diff("src/a.rs", 3), file_diff("src/b.rs", 2));
        let files = split_by_file(&diff);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/a.rs");
        assert_eq!(files[1].path, "src/b.rs");
        let rebuilt: String = files.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(rebuilt, diff);
    }

    #[test]
    fn chunks_reconstruct_the_same_file_set() {
        let diff =
            format!("{}{}{}", file_diff("a.rs", 50), file_diff("b.rs", 50), file_diff("c.rs", 50));
        let chunks = chunk_diff(&diff, 200, 30);
        let all_paths: Vec<String> =
            chunks.iter().flat_map(|c| c.files.iter().map(|f| f.path.clone())).collect();
        assert_eq!(all_paths, vec!["a.rs", "b.rs", "c.rs"]);

        let rebuilt: String = chunks.iter().map(|c| c.content()).collect();
        assert_eq!(rebuilt, diff);
    }

    #[test]
    fn chunk_indices_run_one_to_n() {
        let diff: String = (0..8).map(|i| file_diff(&format!("f{i}.rs"), 40)).collect();
        let chunks = chunk_diff(&diff, 150, 30);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i + 1);
        }
    }

    #[test]
    fn chunks_respect_token_budget_except_oversize_singletons() {
        let diff = format!("{}{}", file_diff("small.rs", 5), file_diff("huge.rs", 2000));
        let max_tokens = 300;
        let chunks = chunk_diff(&diff, max_tokens, 30);
        for chunk in &chunks {
            if chunk.files.len() == 1 {
                continue; // a lone oversize file is allowed to exceed
            }
            assert!(chunk.estimated_tokens <= max_tokens);
        }
        let huge_chunk = chunks
            .iter()
            .find(|c| c.files.iter().any(|f| f.path == "huge.rs"))
            .expect("huge chunk");
        assert_eq!(huge_chunk.files.len(), 1);
        assert!(huge_chunk.estimated_tokens > max_tokens);
    }

    #[test]
    fn max_files_per_chunk_is_enforced() {
        let diff: String = (0..10).map(|i| file_diff(&format!("f{i}.rs"), 1)).collect();
        let chunks = chunk_diff(&diff, 1_000_000, 4);
        assert!(chunks.iter().all(|c| c.files.len() <= 4));
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn empty_diff_yields_no_chunks() {
        assert!(chunk_diff("", 100, 10).is_empty());
    }
}
