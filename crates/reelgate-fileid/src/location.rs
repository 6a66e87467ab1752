//! Decoded binary location of a stored file.
//!
//! Layout after the transport layer is removed (all little-endian):
//!
//! ```text
//! i32 type | flags        low 24 bits: FileType, bit 24: web, bit 25: file reference
//! i32 dc_id
//! [tl bytes file_reference]             if bit 25
//! web:      tl string url, i64 access_hash
//! document: i64 media_id, i64 access_hash
//! photo:    i64 media_id, i64 access_hash,
//!           [i64 volume_id]             if major < 4
//!           [i32 thumbnail_source]      if major >= 4 (legacy otherwise)
//!           source fields
//! u8 minor                              if major >= 4
//! u8 major
//! ```

use crate::codec::{self, FieldReader, FieldWriter};
use crate::{Error, Result};

const WEB_LOCATION_FLAG: u32 = 1 << 24;
const FILE_REFERENCE_FLAG: u32 = 1 << 25;
const TYPE_MASK: u32 = 0x00FF_FFFF;

/// First major version that carries a minor byte and a thumbnail source.
const VERSIONED_LAYOUT: u8 = 4;

/// Current version written by [`FileLocation::document`] and friends.
pub const CURRENT_MAJOR: u8 = 4;
pub const CURRENT_MINOR: u8 = 30;

/// Kind of stored file, the type discriminant of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Thumbnail,
    ChatPhoto,
    Photo,
    Voice,
    Video,
    Document,
    Encrypted,
    Temp,
    Sticker,
    Audio,
    Animation,
    EncryptedThumbnail,
    Wallpaper,
    VideoNote,
    SecureRaw,
    Secure,
    Background,
    DocumentAsFile,
}

impl FileType {
    pub fn from_raw(raw: u32) -> Result<Self> {
        Ok(match raw {
            0 => Self::Thumbnail,
            1 => Self::ChatPhoto,
            2 => Self::Photo,
            3 => Self::Voice,
            4 => Self::Video,
            5 => Self::Document,
            6 => Self::Encrypted,
            7 => Self::Temp,
            8 => Self::Sticker,
            9 => Self::Audio,
            10 => Self::Animation,
            11 => Self::EncryptedThumbnail,
            12 => Self::Wallpaper,
            13 => Self::VideoNote,
            14 => Self::SecureRaw,
            15 => Self::Secure,
            16 => Self::Background,
            17 => Self::DocumentAsFile,
            other => return Err(Error::UnknownFileType(other)),
        })
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// Photo-like types carry a photo location after the media id.
    pub fn is_photo(self) -> bool {
        matches!(
            self,
            Self::Thumbnail
                | Self::ChatPhoto
                | Self::Photo
                | Self::Wallpaper
                | Self::EncryptedThumbnail
        )
    }
}

/// Where a photo-like file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailSource {
    Legacy {
        secret: i64,
        local_id: i32,
    },
    Thumbnail {
        file_type: i32,
        size: char,
    },
    ChatPhotoSmall {
        chat_id: i64,
        chat_access_hash: i64,
        volume_id: i64,
        local_id: i32,
    },
    ChatPhotoBig {
        chat_id: i64,
        chat_access_hash: i64,
        volume_id: i64,
        local_id: i32,
    },
    StickerSetThumbnail {
        set_id: i64,
        set_access_hash: i64,
        volume_id: i64,
        local_id: i32,
    },
}

impl ThumbnailSource {
    fn discriminant(&self) -> i32 {
        match self {
            Self::Legacy { .. } => 0,
            Self::Thumbnail { .. } => 1,
            Self::ChatPhotoSmall { .. } => 2,
            Self::ChatPhotoBig { .. } => 3,
            Self::StickerSetThumbnail { .. } => 4,
        }
    }

    fn read(r: &mut FieldReader<'_>, discriminant: i32) -> Result<Self> {
        Ok(match discriminant {
            0 => Self::Legacy {
                secret: r.read_i64("secret")?,
                local_id: r.read_i32("local_id")?,
            },
            1 => {
                let file_type = r.read_i32("thumbnail_file_type")?;
                let raw = r.read_u32("thumbnail_size")?;
                let size = char::from_u32(raw)
                    .ok_or_else(|| Error::InvalidEncoding(format!("thumbnail_size {raw}")))?;
                Self::Thumbnail { file_type, size }
            }
            2 | 3 => {
                let chat_id = r.read_i64("chat_id")?;
                let chat_access_hash = r.read_i64("chat_access_hash")?;
                let volume_id = r.read_i64("volume_id")?;
                let local_id = r.read_i32("local_id")?;
                if discriminant == 2 {
                    Self::ChatPhotoSmall {
                        chat_id,
                        chat_access_hash,
                        volume_id,
                        local_id,
                    }
                } else {
                    Self::ChatPhotoBig {
                        chat_id,
                        chat_access_hash,
                        volume_id,
                        local_id,
                    }
                }
            }
            4 => Self::StickerSetThumbnail {
                set_id: r.read_i64("sticker_set_id")?,
                set_access_hash: r.read_i64("sticker_set_access_hash")?,
                volume_id: r.read_i64("volume_id")?,
                local_id: r.read_i32("local_id")?,
            },
            other => return Err(Error::UnknownThumbnailSource(other)),
        })
    }

    fn write(&self, w: &mut FieldWriter) {
        match self {
            Self::Legacy { secret, local_id } => {
                w.put_i64(*secret);
                w.put_i32(*local_id);
            }
            Self::Thumbnail { file_type, size } => {
                w.put_i32(*file_type);
                w.put_u32(*size as u32);
            }
            Self::ChatPhotoSmall {
                chat_id,
                chat_access_hash,
                volume_id,
                local_id,
            }
            | Self::ChatPhotoBig {
                chat_id,
                chat_access_hash,
                volume_id,
                local_id,
            } => {
                w.put_i64(*chat_id);
                w.put_i64(*chat_access_hash);
                w.put_i64(*volume_id);
                w.put_i32(*local_id);
            }
            Self::StickerSetThumbnail {
                set_id,
                set_access_hash,
                volume_id,
                local_id,
            } => {
                w.put_i64(*set_id);
                w.put_i64(*set_access_hash);
                w.put_i64(*volume_id);
                w.put_i32(*local_id);
            }
        }
    }
}

/// The part of a location that depends on the file type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationKind {
    Web {
        url: String,
        access_hash: i64,
    },
    Document {
        media_id: i64,
        access_hash: i64,
    },
    Photo {
        media_id: i64,
        access_hash: i64,
        volume_id: Option<i64>,
        source: ThumbnailSource,
    },
}

/// A fully decoded stored-file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub major: u8,
    pub minor: u8,
    pub file_type: FileType,
    /// Datacenter holding the file.
    pub dc_id: i32,
    pub file_reference: Option<Vec<u8>>,
    pub kind: LocationKind,
}

impl FileLocation {
    /// A document-style location at the current version.
    pub fn document(file_type: FileType, dc_id: i32, media_id: i64, access_hash: i64) -> Self {
        Self {
            major: CURRENT_MAJOR,
            minor: CURRENT_MINOR,
            file_type,
            dc_id,
            file_reference: None,
            kind: LocationKind::Document {
                media_id,
                access_hash,
            },
        }
    }

    pub fn with_file_reference(mut self, file_reference: Vec<u8>) -> Self {
        self.file_reference = Some(file_reference);
        self
    }

    /// Content id of the stored media, absent for web locations.
    pub fn media_id(&self) -> Option<i64> {
        match &self.kind {
            LocationKind::Document { media_id, .. } | LocationKind::Photo { media_id, .. } => {
                Some(*media_id)
            }
            LocationKind::Web { .. } => None,
        }
    }

    pub fn access_hash(&self) -> i64 {
        match &self.kind {
            LocationKind::Web { access_hash, .. }
            | LocationKind::Document { access_hash, .. }
            | LocationKind::Photo { access_hash, .. } => *access_hash,
        }
    }

    /// Decode a reference string. Pure and deterministic.
    pub fn decode(reference: &str) -> Result<Self> {
        let payload = codec::unpack(reference)?;
        Self::from_payload(&payload)
    }

    fn from_payload(payload: &[u8]) -> Result<Self> {
        let (&major, rest) = payload
            .split_last()
            .ok_or_else(|| Error::truncated("major", 1, 0))?;
        let (minor, body) = if major >= VERSIONED_LAYOUT {
            let (&minor, body) = rest
                .split_last()
                .ok_or_else(|| Error::truncated("minor", 1, 0))?;
            (minor, body)
        } else {
            (0, rest)
        };

        let mut r = FieldReader::new(body);
        let raw_type = r.read_i32("file_type")? as u32;
        let dc_id = r.read_i32("dc_id")?;

        let has_web_location = raw_type & WEB_LOCATION_FLAG != 0;
        let has_file_reference = raw_type & FILE_REFERENCE_FLAG != 0;
        let file_type = FileType::from_raw(raw_type & TYPE_MASK)?;

        let file_reference = if has_file_reference {
            Some(r.read_tl_bytes("file_reference")?)
        } else {
            None
        };

        let kind = if has_web_location {
            LocationKind::Web {
                url: r.read_tl_string("url")?,
                access_hash: r.read_i64("access_hash")?,
            }
        } else {
            let media_id = r.read_i64("media_id")?;
            let access_hash = r.read_i64("access_hash")?;
            if file_type.is_photo() {
                let volume_id = if major < VERSIONED_LAYOUT {
                    Some(r.read_i64("volume_id")?)
                } else {
                    None
                };
                let discriminant = if major >= VERSIONED_LAYOUT {
                    r.read_i32("thumbnail_source")?
                } else {
                    0
                };
                let source = ThumbnailSource::read(&mut r, discriminant)?;
                LocationKind::Photo {
                    media_id,
                    access_hash,
                    volume_id,
                    source,
                }
            } else {
                LocationKind::Document {
                    media_id,
                    access_hash,
                }
            }
        };

        if r.remaining() > 0 {
            return Err(Error::TrailingBytes(r.remaining()));
        }

        Ok(Self {
            major,
            minor,
            file_type,
            dc_id,
            file_reference,
            kind,
        })
    }

    /// Encode back into a reference string.
    pub fn encode(&self) -> Result<String> {
        let mut raw_type = self.file_type.as_raw();
        if matches!(self.kind, LocationKind::Web { .. }) {
            raw_type |= WEB_LOCATION_FLAG;
        }
        if self.file_reference.is_some() {
            raw_type |= FILE_REFERENCE_FLAG;
        }

        let mut w = FieldWriter::new();
        w.put_i32(raw_type as i32);
        w.put_i32(self.dc_id);
        if let Some(reference) = &self.file_reference {
            w.put_tl_bytes(reference);
        }

        match &self.kind {
            LocationKind::Web { url, access_hash } => {
                w.put_tl_bytes(url.as_bytes());
                w.put_i64(*access_hash);
            }
            LocationKind::Document {
                media_id,
                access_hash,
            } => {
                w.put_i64(*media_id);
                w.put_i64(*access_hash);
            }
            LocationKind::Photo {
                media_id,
                access_hash,
                volume_id,
                source,
            } => {
                w.put_i64(*media_id);
                w.put_i64(*access_hash);
                if self.major < VERSIONED_LAYOUT {
                    let volume_id = volume_id.ok_or_else(|| {
                        Error::Unencodable(format!("major {} requires volume_id", self.major))
                    })?;
                    if !matches!(source, ThumbnailSource::Legacy { .. }) {
                        return Err(Error::Unencodable(format!(
                            "major {} only supports legacy photo sources",
                            self.major
                        )));
                    }
                    w.put_i64(volume_id);
                } else {
                    w.put_i32(source.discriminant());
                }
                source.write(&mut w);
            }
        }

        if self.major >= VERSIONED_LAYOUT {
            w.put_u8(self.minor);
        }
        w.put_u8(self.major);

        Ok(codec::pack(&w.into_vec()))
    }
}
