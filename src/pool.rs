use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};
use tracing::info;

#[derive(thiserror::Error, Debug)]
#[error("failed to read {}: {source}", .path.display())]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Every password that has already been written to the backing file.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct SeenSet(HashSet<Box<str>>);

impl SeenSet {
    pub fn contains(&self, password: &str) -> bool {
        self.0.contains(password)
    }

    pub fn insert(&mut self, password: &str) -> bool {
        self.0.insert(Box::from(password))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::default();
        for password in iter {
            set.insert(password.as_ref());
        }
        set
    }
}

/// Loads the backing file into a [`SeenSet`]. A missing file is a cold start and yields an
/// empty set.
pub async fn load(path: &Path) -> Result<SeenSet, LoadError> {
    let Some(lines) = read_lines(path).await? else {
        info!(path = %path.display(), "Wordlist not found, starting fresh");
        return Ok(SeenSet::default());
    };

    let set: SeenSet = lines.into_iter().collect();
    info!(
        path = %path.display(),
        count = set.len(),
        "Loaded existing passwords from wordlist"
    );

    Ok(set)
}

/// Reads every non-empty, whitespace-trimmed line of `path`. Returns `None` if the file
/// doesn't exist.
pub async fn read_lines(path: &Path) -> Result<Option<Vec<String>>, LoadError> {
    let to_err = |source| LoadError {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(to_err(e)),
    };

    let mut reader = BufReader::new(file).lines();
    let mut out = Vec::new();

    while let Some(line) = reader.next_line().await.map_err(to_err)? {
        let line = line.trim();
        if !line.is_empty() {
            out.push(line.to_string());
        }
    }

    Ok(Some(out))
}
