// Blocks live one per file, `block_<id>.bin`, inside a directory that
// belongs to a single named ledger. The store only moves bytes; the ledger
// owns the in-memory chain.

use crate::core::Block;
use crate::error::{LedgerError, Result};
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const BLOCK_FILE_PREFIX: &str = "block_";
const BLOCK_FILE_EXTENSION: &str = "bin";
const TMP_FILE_EXTENSION: &str = "tmp";
const LEDGER_DIR_PREFIX: &str = "ledger_";

#[derive(Debug, Clone)]
pub struct BlockStore {
    dir: PathBuf,
}

impl BlockStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> BlockStore {
        BlockStore { dir: dir.into() }
    }

    /// Store for the ledger called `ledger_name` under `data_dir`
    /// (e.g. `data/ledger_orders/`), so several ledgers can share a data dir.
    pub fn for_ledger(data_dir: &Path, ledger_name: &str) -> BlockStore {
        BlockStore::new(data_dir.join(format!("{LEDGER_DIR_PREFIX}{ledger_name}")))
    }

    pub fn get_dir(&self) -> &Path {
        &self.dir
    }

    /// Write `block`, replacing any file with the same id.
    pub fn save_block(&self, block: &Block) -> Result<()> {
        // Write-then-rename so a crash never leaves a half-written block behind.
        let (tmp_path, path) = self.stage_block(block)?;
        if let Err(e) = commit(&tmp_path, &path) {
            discard(&[(tmp_path, path)]);
            return Err(e);
        }
        debug!("Saved block {} to {}", block.get_id(), path.display());
        Ok(())
    }

    /// Overwrite the stored `current` chain with `chain`.
    ///
    /// Only blocks from the first difference onwards are written. All of them
    /// are staged before any is moved into place, so a failed write leaves the
    /// stored chain as it was. If a move fails part way, the blocks already
    /// moved are put back from `current`.
    pub fn replace_chain(&self, current: &[Block], chain: &[Block]) -> Result<()> {
        let shared = current
            .iter()
            .zip(chain)
            .take_while(|(old, new)| old == new)
            .count();

        let mut staged = Vec::with_capacity(chain.len() - shared);
        for block in &chain[shared..] {
            match self.stage_block(block) {
                Ok(paths) => staged.push(paths),
                Err(e) => {
                    discard(&staged);
                    return Err(e);
                }
            }
        }

        for (index, (tmp_path, path)) in staged.iter().enumerate() {
            if let Err(e) = commit(tmp_path, path) {
                discard(&staged[index..]);
                self.restore(current, &chain[shared..shared + index]);
                return Err(e);
            }
        }

        debug!(
            "Replaced blocks {}..={} in {}",
            shared + 1,
            chain.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn stage_block(&self, block: &Block) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            LedgerError::Storage(format!("Failed to create {}: {e}", self.dir.display()))
        })?;

        let bytes = block.serialize()?;
        let path = self.block_path(block.get_id());
        let tmp_path = path.with_extension(TMP_FILE_EXTENSION);
        fs::write(&tmp_path, &bytes).map_err(|e| {
            LedgerError::Storage(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        Ok((tmp_path, path))
    }

    // Best effort: the error that triggered the rollback is what gets reported.
    fn restore(&self, current: &[Block], overwritten: &[Block]) {
        for block in overwritten {
            let id = block.get_id();
            let result = match current.iter().find(|old| old.get_id() == id) {
                Some(old) => self.save_block(old),
                None => fs::remove_file(self.block_path(id)).map_err(LedgerError::from),
            };
            if let Err(e) = result {
                warn!("Failed to restore block {id} in {}: {e}", self.dir.display());
            }
        }
    }

    /// `Ok(None)` when no block with `id` has been saved.
    pub fn load_block(&self, id: u64) -> Result<Option<Block>> {
        let path = self.block_path(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(Block::deserialize(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LedgerError::Storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Every stored block in ascending numeric id order.
    pub fn load_chain(&self) -> Result<Vec<Block>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(LedgerError::Storage(format!(
                    "Failed to list {}: {e}",
                    self.dir.display()
                )))
            }
        };

        let mut files: Vec<(u64, PathBuf)> = vec![];
        for entry in entries {
            let entry = entry.map_err(|e| {
                LedgerError::Storage(format!("Failed to list {}: {e}", self.dir.display()))
            })?;
            let file_name = entry.file_name();
            if let Some(id) = file_name.to_str().and_then(parse_block_id) {
                files.push((id, entry.path()));
            }
        }
        files.sort_by_key(|(id, _)| *id);

        let mut chain = Vec::with_capacity(files.len());
        for (_, path) in files {
            let bytes = fs::read(&path).map_err(|e| {
                LedgerError::Storage(format!("Failed to read {}: {e}", path.display()))
            })?;
            chain.push(Block::deserialize(&bytes)?);
        }
        Ok(chain)
    }

    fn block_path(&self, id: u64) -> PathBuf {
        self.dir
            .join(format!("{BLOCK_FILE_PREFIX}{id}.{BLOCK_FILE_EXTENSION}"))
    }
}

fn commit(tmp_path: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp_path, path).map_err(|e| {
        LedgerError::Storage(format!("Failed to move block into {}: {e}", path.display()))
    })
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp_path, _) in staged {
        let _ = fs::remove_file(tmp_path);
    }
}

fn parse_block_id(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(BLOCK_FILE_PREFIX)?
        .strip_suffix(BLOCK_FILE_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}
