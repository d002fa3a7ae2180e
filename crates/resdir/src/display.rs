//! Node dump and list view.

use std::io;

use resdir_pe::{NodeData, NodeKind, ResourceNode};

use crate::output::Output;
use crate::path::build_path;
use crate::walk::preorder;
use crate::Resources;

/// Report every node, one block per node in pre-order.
pub fn show_nodes(res: Resources<'_>, out: &mut dyn Output) -> io::Result<()> {
    for (_, node) in preorder(res.tree(), res.root()) {
        show_node(node, out)?;
    }
    Ok(())
}

/// Report the fields of a single node.
pub fn show_node(node: &ResourceNode, out: &mut dyn Output) -> io::Result<()> {
    out.emit(
        "\nNode Type / Level",
        &format!("{} / {}", node.kind(), node.dir_level()),
    )?;

    match node.data() {
        NodeData::Directory(dir) => {
            out.emit("Characteristics", &dir.characteristics.to_string())?;
            out.emit("Timestamp", &dir.time_date_stamp.to_string())?;
            out.emit("Major Version", &dir.major_version.to_string())?;
            out.emit("Minor Version", &dir.minor_version.to_string())?;
            out.emit("Named entries", &dir.named_entries.to_string())?;
            out.emit("Id entries", &dir.id_entries.to_string())?;
        }
        NodeData::DirectoryEntry(entry) => {
            out.emit("Name offset", &entry.name.raw_value().to_string())?;
            out.emit("Name is string", flag(entry.name.is_string()))?;
            out.emit("Offset to directory", &format!("{:x}", entry.target.offset()))?;
            out.emit("Data is directory", flag(entry.target.is_directory()))?;
        }
        NodeData::DataString(string) => {
            out.emit("String len", &string.length.to_string())?;
            out.emit("String", &string.to_single_byte(usize::MAX))?;
        }
        NodeData::DataEntry(entry) => {
            out.emit("OffsetToData", &format!("{:x}", entry.offset_to_data))?;
            out.emit("Size", &entry.size.to_string())?;
            out.emit("CodePage", &entry.code_page.to_string())?;
            out.emit("Reserved", &entry.reserved.to_string())?;
        }
    }

    Ok(())
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Report one `<path> (<size> bytes)` line per data entry.
pub fn show_list(res: Resources<'_>, out: &mut dyn Output) -> io::Result<()> {
    let leaves = preorder(res.tree(), res.root()).filter(|(_, n)| n.kind() == NodeKind::DataEntry);

    for (id, node) in leaves {
        let size = node.as_data_entry().map_or(0, |e| e.size);
        out.line(&format!("{} ({size} bytes)", build_path(res, id)))?;
    }
    Ok(())
}
