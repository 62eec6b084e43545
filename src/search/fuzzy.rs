/// One row of the Levenshtein dynamic-programming table.
///
/// Walking a trie extends the candidate word one character per level, so each
/// child only needs its parent's row to compute its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevenshteinRow {
    cells: Vec<usize>,
}

impl LevenshteinRow {
    /// Row for the empty candidate: distance j to the first j target chars
    pub fn start(target_len: usize) -> Self {
        LevenshteinRow {
            cells: (0..=target_len).collect(),
        }
    }

    /// Row after appending `ch` to the candidate
    pub fn step(&self, target: &[char], ch: char) -> Self {
        let mut cells = Vec::with_capacity(self.cells.len());
        cells.push(self.cells[0] + 1);

        for j in 1..self.cells.len() {
            let cost = if target[j - 1] == ch { 0 } else { 1 };
            let value = std::cmp::min(
                std::cmp::min(
                    self.cells[j] + 1, // deletion
                    cells[j - 1] + 1,  // insertion
                ),
                self.cells[j - 1] + cost, // substitution
            );
            cells.push(value);
        }

        LevenshteinRow { cells }
    }

    /// Distance between the candidate so far and the whole target
    pub fn distance(&self) -> usize {
        self.cells[self.cells.len() - 1]
    }

    /// Lower bound on the distance of any extension of the candidate
    pub fn min(&self) -> usize {
        self.cells.iter().copied().min().unwrap_or(0)
    }
}

/// Levenshtein distance between two strings, counted in chars
pub fn edit_distance(a: &str, b: &str) -> usize {
    let target: Vec<char> = b.chars().collect();
    a.chars()
        .fold(LevenshteinRow::start(target.len()), |row, ch| row.step(&target, ch))
        .distance()
}
