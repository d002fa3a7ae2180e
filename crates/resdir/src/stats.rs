//! Node statistics.

use std::io;

use resdir_pe::NodeKind;

use crate::output::Output;
use crate::walk::walk;
use crate::Resources;

/// Node counts of a resource tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub total: usize,
    counts: [usize; 4],
}

fn slot(kind: NodeKind) -> usize {
    match kind {
        NodeKind::ResourceDirectory => 0,
        NodeKind::DirectoryEntry => 1,
        NodeKind::DataString => 2,
        NodeKind::DataEntry => 3,
    }
}

impl ResourceStats {
    /// Count every node in a single walk from the root.
    pub fn collect(res: Resources<'_>) -> Self {
        let mut stats = Self::default();
        walk(res.tree(), res.root(), |_, node| {
            stats.total += 1;
            stats.counts[slot(node.kind())] += 1;
        });
        stats
    }

    /// Number of nodes of `kind`.
    pub fn count(&self, kind: NodeKind) -> usize {
        self.counts[slot(kind)]
    }

    /// Report the counters.
    pub fn emit(&self, out: &mut dyn Output) -> io::Result<()> {
        out.emit("Total Structs", &self.total.to_string())?;
        for kind in NodeKind::ALL {
            out.emit(&format!("Total {kind}"), &self.count(kind).to_string())?;
        }
        Ok(())
    }
}
