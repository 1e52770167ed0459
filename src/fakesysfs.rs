//! A synthetic sysfs tree, built in memory and written to disk as a test double.
//!
//! ```no_run
//! use topologyinfo_rs::fakesysfs::{FakeSysfs, attrs};
//!
//! # fn main() -> topologyinfo_rs::TopologyResult<()> {
//! let mut fake = FakeSysfs::new("/tmp/fake-sysfs");
//! fake.add_tree(&["bus", "pci", "devices"]).add(
//!     "0000:00:01.0",
//!     Some(attrs([("numa_node", "0"), ("class", "0x020000")])),
//! );
//! fake.setup()?;
//! // ... point discovery at /tmp/fake-sysfs ...
//! fake.teardown()?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, symlink};
use std::path::{Path, PathBuf};

use log::trace;

use crate::error::{TopologyError, TopologyResult};

const DIR_MODE: u32 = 0o755;
const ATTR_MODE: u32 = 0o644;

/// Attribute filename -> file content.
pub type Attrs = BTreeMap<String, String>;

/// Builds an [`Attrs`] map out of string pairs.
pub fn attrs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Attrs {
    pairs
        .into_iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect()
}

/// One directory of the synthetic tree.
#[derive(Debug, Clone)]
pub struct Tree {
    name: String,
    attrs: Option<Attrs>,
    links: Vec<(String, PathBuf)>,
    items: Vec<Tree>,
}

impl Tree {
    pub fn new(name: impl Into<String>, attrs: Option<Attrs>) -> Self {
        Self {
            name: name.into(),
            attrs,
            links: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Appends a child directory and returns it, so paths can be built by chaining.
    /// A name containing `/` creates the intermediate directories too.
    pub fn add(&mut self, name: impl Into<String>, attrs: Option<Attrs>) -> &mut Self {
        let idx = self.items.len();
        self.items.push(Self::new(name, attrs));
        &mut self.items[idx]
    }

    /// Adds a symbolic link `name` pointing to `target` inside this directory.
    /// Returns `self`, the link has no children of its own.
    pub fn add_symlink(
        &mut self,
        name: impl Into<String>,
        target: impl Into<PathBuf>,
    ) -> &mut Self {
        self.links.push((name.into(), target.into()));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn items(&self) -> &[Self] {
        &self.items
    }

    /// Materializes the children of this node under `base`.
    ///
    /// This node stands for `base` itself, which must already exist: only its
    /// attributes and links are written there, never a directory named after it.
    ///
    /// # Errors
    /// Fails on a root named `""` or `"."`, on an empty or missing `base`, on a
    /// child directory that already exists (two siblings with the same name),
    /// and on the first filesystem error. Whatever was created before the
    /// error stays.
    pub fn create(&self, base: &Path) -> TopologyResult<()> {
        if self.name.is_empty() || self.name == "." {
            return Err(TopologyError::InvalidRoot(self.name.clone()));
        }
        if base.as_os_str().is_empty() {
            return Err(TopologyError::InvalidRoot(base.display().to_string()));
        }
        if !fs::metadata(base)
            .map_err(|e| TopologyError::io_at(base, e))?
            .is_dir()
        {
            return Err(TopologyError::io_at(
                base,
                io::Error::new(io::ErrorKind::NotADirectory, "base is not a directory"),
            ));
        }
        self.populate(base)
    }

    fn populate(&self, dir: &Path) -> TopologyResult<()> {
        self.set_attrs(dir)?;
        self.set_links(dir)?;
        for item in &self.items {
            let sub = dir.join(&item.name);
            trace!("mkdir {}", sub.display());
            // only the segments leading to a "a/b/c" name may already exist
            if let Some(parent) = sub.parent() {
                DirBuilder::new()
                    .recursive(true)
                    .mode(DIR_MODE)
                    .create(parent)
                    .map_err(|e| TopologyError::io_at(parent, e))?;
            }
            DirBuilder::new()
                .mode(DIR_MODE)
                .create(&sub)
                .map_err(|e| TopologyError::io_at(&sub, e))?;
            item.populate(&sub)?;
        }
        Ok(())
    }

    fn set_attrs(&self, dir: &Path) -> TopologyResult<()> {
        let Some(attrs) = &self.attrs else {
            return Ok(());
        };
        for (name, content) in attrs {
            let path = dir.join(name);
            trace!("write {} ({} bytes)", path.display(), content.len());
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(ATTR_MODE)
                .open(&path)
                .and_then(|mut f| f.write_all(content.as_bytes()))
                .map_err(|e| TopologyError::io_at(&path, e))?;
        }
        Ok(())
    }

    fn set_links(&self, dir: &Path) -> TopologyResult<()> {
        for (name, target) in &self.links {
            let path = dir.join(name);
            trace!("symlink {} -> {}", path.display(), target.display());
            symlink(target, &path).map_err(|e| TopologyError::io_at(&path, e))?;
        }
        Ok(())
    }
}

/// A synthetic sysfs rooted at an existing base directory.
#[derive(Debug, Clone)]
pub struct FakeSysfs {
    base: PathBuf,
    root: Tree,
}

impl FakeSysfs {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            // must not be "." nor "", see Tree::create
            root: Tree::new("_", None),
        }
    }

    /// Same as calling [`Tree::add`] once per segment, starting at the root.
    pub fn add_tree(&mut self, entries: &[&str]) -> &mut Tree {
        entries
            .iter()
            .fold(&mut self.root, |pos, entry| pos.add(*entry, None))
    }

    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    #[must_use]
    pub fn root(&self) -> &Tree {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Tree {
        &mut self.root
    }

    /// Writes the whole tree under the base directory.
    ///
    /// # Errors
    /// See [`Tree::create`]. Callers should still [`teardown`](Self::teardown) on failure.
    pub fn setup(&self) -> TopologyResult<()> {
        self.root.create(&self.base)
    }

    /// Recursively removes the base directory.
    ///
    /// # Errors
    /// Fails if the base directory cannot be removed.
    pub fn teardown(&self) -> TopologyResult<()> {
        fs::remove_dir_all(&self.base).map_err(|e| TopologyError::io_at(&self.base, e))
    }
}
