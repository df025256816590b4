pub mod emojis;

pub mod colors {
    pub const RED: u32 = 0xFF0000;
    pub const ORANGE: u32 = 0xFFA500;
}

/// Discord rejects embed field values longer than this.
pub const EMBED_FIELD_LIMIT: usize = 1024;
/// Discord rejects embeds with more fields than this.
pub const EMBED_MAX_FIELDS: usize = 25;
/// Most message ids one bulk-delete request accepts.
pub const BULK_DELETE_LIMIT: usize = 100;
