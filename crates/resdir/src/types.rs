//! Well-known resource types.
//!
//! Maps the numeric type identifiers found at level 1 to a symbolic name, the
//! subdirectory extracted payloads are written to, and a file extension.

/// Information about a well-known resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    pub id: u32,
    /// Symbolic name used in synthesized paths.
    pub name: &'static str,
    /// Subdirectory of the extraction root.
    pub dir_name: &'static str,
    /// File extension, including the leading dot.
    pub extension: &'static str,
}

pub const RT_CURSOR: u32 = 1;
pub const RT_BITMAP: u32 = 2;
pub const RT_ICON: u32 = 3;
pub const RT_MENU: u32 = 4;
pub const RT_DIALOG: u32 = 5;
pub const RT_STRING: u32 = 6;
pub const RT_FONTDIR: u32 = 7;
pub const RT_FONT: u32 = 8;
pub const RT_ACCELERATOR: u32 = 9;
pub const RT_RCDATA: u32 = 10;
pub const RT_MESSAGETABLE: u32 = 11;
pub const RT_GROUP_CURSOR: u32 = 12;
pub const RT_GROUP_ICON: u32 = 14;
pub const RT_VERSION: u32 = 16;
pub const RT_DLGINCLUDE: u32 = 17;
pub const RT_PLUGPLAY: u32 = 19;
pub const RT_VXD: u32 = 20;
pub const RT_ANICURSOR: u32 = 21;
pub const RT_ANIICON: u32 = 22;
pub const RT_HTML: u32 = 23;
pub const RT_MANIFEST: u32 = 24;
pub const RT_DLGINIT: u32 = 240;
pub const RT_TOOLBAR: u32 = 241;

/// Extension used when the type is not well-known.
pub const UNKNOWN_EXTENSION: &str = ".bin";

const fn entry(
    id: u32,
    name: &'static str,
    extension: &'static str,
    dir_name: &'static str,
) -> ResourceType {
    ResourceType {
        id,
        name,
        dir_name,
        extension,
    }
}

/// All well-known types, sorted by id.
pub static RESOURCE_TYPES: &[ResourceType] = &[
    entry(RT_CURSOR, "CURSOR", ".cur", "cursors"),
    entry(RT_BITMAP, "BITMAP", ".bmp", "bitmaps"),
    entry(RT_ICON, "ICON", ".ico", "icons"),
    entry(RT_MENU, "MENU", ".rc", "menus"),
    entry(RT_DIALOG, "DIALOG", ".dlg", "dialogs"),
    entry(RT_STRING, "STRING", ".rc", "strings"),
    entry(RT_FONTDIR, "FONTDIR", ".fnt", "fontdirs"),
    entry(RT_FONT, "FONT", ".fnt", "fonts"),
    entry(RT_ACCELERATOR, "ACCELERATOR", ".rc", "accelerators"),
    entry(RT_RCDATA, "RCDATA", ".rc", "rcdatas"),
    entry(RT_MESSAGETABLE, "MESSAGETABLE", ".mc", "messagetables"),
    entry(RT_GROUP_CURSOR, "GROUP_CURSOR", ".cur", "groupcursors"),
    entry(RT_GROUP_ICON, "GROUP_ICON", ".ico", "groupicons"),
    entry(RT_VERSION, "VERSION", ".rc", "versions"),
    entry(RT_DLGINCLUDE, "DLGINCLUDE", ".rc", "dlgincludes"),
    entry(RT_PLUGPLAY, "PLUGPLAY", ".rc", "plugplays"),
    entry(RT_VXD, "VXD", ".rc", "xvds"),
    entry(RT_ANICURSOR, "ANICURSOR", ".rc", "anicursors"),
    entry(RT_ANIICON, "ANIICON", ".rc", "aniicons"),
    entry(RT_HTML, "HTML", ".html", "htmls"),
    entry(RT_MANIFEST, "MANIFEST", ".xml", "manifests"),
    entry(RT_DLGINIT, "DLGINIT", ".rc", "dlginits"),
    entry(RT_TOOLBAR, "TOOLBAR", ".rc", "toolbars"),
];

/// Look up a well-known type by id.
pub fn lookup(id: u32) -> Option<&'static ResourceType> {
    RESOURCE_TYPES
        .binary_search_by_key(&id, |t| t.id)
        .ok()
        .map(|index| &RESOURCE_TYPES[index])
}

/// Extension for a possibly unknown type.
pub fn extension_for(resource_type: Option<&ResourceType>) -> &'static str {
    resource_type.map_or(UNKNOWN_EXTENSION, |t| t.extension)
}
