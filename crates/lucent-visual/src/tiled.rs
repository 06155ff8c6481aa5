//! Tiled map documents (`.tmj` JSON) and tile geometry generation.
//!
//! Only the subset of the format the renderer needs is read: grid and tile
//! dimensions, tilesets (first gid, atlas columns), tile layers with a flat
//! `data` array, and object groups. Tile index `0` means an empty cell.
//! Objects on the [`layers::COLLISION`] layer become static collision boxes.

use std::path::Path;

use glam::{Vec2, Vec3};
use serde::Deserialize;

use crate::VisualError;

/// Reserved layer names.
pub mod layers {
    /// Selects every tile layer.
    pub const ALL: &str = "All";
    pub const DEFAULT: &str = "Default";
    /// Object layer whose objects become collision boxes.
    pub const COLLISION: &str = "Collision";
    pub const OBJECTS: &str = "Objects";
}

/// Layer `type` strings as written by the editor.
pub mod layer_type {
    pub const TILE_LAYER: &str = "tilelayer";
    pub const OBJECT_GROUP: &str = "objectgroup";
}

/// Gids carry flip flags in their top three bits.
const GID_MASK: u32 = 0x1FFF_FFFF;

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawMap {
    width: u32,
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    tilesets: Vec<RawTileset>,
    #[serde(default)]
    layers: Vec<RawLayer>,
}

#[derive(Debug, Deserialize)]
struct RawTileset {
    #[serde(default = "default_first_gid")]
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    columns: Option<u32>,
}

fn default_first_gid() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Vec<u32>,
    #[serde(default)]
    objects: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    x: f32,
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    properties: Vec<RawProperty>,
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    name: String,
    value: serde_json::Value,
}

/// A tileset reference: where its gids start and how its atlas is laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    pub first_gid: u32,
    /// External tileset file or atlas image path, whichever the map names.
    pub source: String,
    /// Atlas columns; derived from the texture width when absent.
    pub columns: Option<u32>,
}

/// An object placed on an object group layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledObject {
    pub name: String,
    pub kind: String,
    /// Top-left corner in map pixels.
    pub position: Vec2,
    pub size: Vec2,
    pub properties: Vec<(String, serde_json::Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerData {
    Tiles(Vec<u32>),
    Objects(Vec<TiledObject>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub data: LayerData,
}

/// A parsed tiled map.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledMap {
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tilesets: Vec<Tileset>,
    pub layers: Vec<Layer>,
}

/// One textured tile quad, corners ordered left-top, right-bottom,
/// left-bottom, right-top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileQuad {
    pub pos: [Vec3; 4],
    pub uv: [Vec2; 4],
}

impl TileQuad {
    /// Expand into two triangles: `0,1,2` and `0,3,1`.
    pub fn triangles(&self) -> [(Vec3, Vec2); 6] {
        let v = |i: usize| (self.pos[i], self.uv[i]);
        [v(0), v(1), v(2), v(0), v(3), v(1)]
    }
}

/// Static collision rectangle in map pixels (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionBox {
    pub position: Vec2,
    pub size: Vec2,
}

/// Everything a map produces for a given layer selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TiledGeometry {
    pub tiles: Vec<TileQuad>,
    pub collision_boxes: Vec<CollisionBox>,
    /// `(layer name, object)` for every object group.
    pub objects: Vec<(String, TiledObject)>,
}

impl TiledMap {
    /// Parse a map from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, VisualError> {
        let raw: RawMap = serde_json::from_str(json).map_err(|e| VisualError::TiledParse {
            details: e.to_string(),
        })?;
        Self::from_raw(raw)
    }

    /// Read and parse a map file.
    pub fn from_file(path: &Path) -> Result<Self, VisualError> {
        let json = std::fs::read_to_string(path).map_err(|e| VisualError::TiledParse {
            details: format!("cannot read '{}': {e}", path.display()),
        })?;
        Self::from_json(&json)
    }

    fn from_raw(raw: RawMap) -> Result<Self, VisualError> {
        if raw.tilewidth == 0 || raw.tileheight == 0 {
            return Err(VisualError::TiledParse {
                details: "tile size must be non-zero".to_owned(),
            });
        }
        let cells = (raw.width as usize) * (raw.height as usize);

        let mut tilesets: Vec<Tileset> = raw
            .tilesets
            .into_iter()
            .map(|t| Tileset {
                first_gid: t.firstgid,
                source: t.source.or(t.image).unwrap_or_default(),
                columns: t.columns.filter(|&c| c > 0),
            })
            .collect();
        tilesets.sort_by_key(|t| t.first_gid);

        let mut layers = Vec::with_capacity(raw.layers.len());
        for layer in raw.layers {
            let data = match layer.kind.as_str() {
                layer_type::TILE_LAYER => {
                    if layer.data.len() != cells {
                        return Err(VisualError::TiledParse {
                            details: format!(
                                "layer '{}' has {} cells, expected {}x{}",
                                layer.name,
                                layer.data.len(),
                                raw.width,
                                raw.height
                            ),
                        });
                    }
                    LayerData::Tiles(layer.data)
                }
                layer_type::OBJECT_GROUP => LayerData::Objects(
                    layer
                        .objects
                        .into_iter()
                        .map(|o| TiledObject {
                            name: o.name,
                            kind: o.kind,
                            position: Vec2::new(o.x, o.y),
                            size: Vec2::new(o.width, o.height),
                            properties: o
                                .properties
                                .into_iter()
                                .map(|p| (p.name, p.value))
                                .collect(),
                        })
                        .collect(),
                ),
                other => {
                    tracing::trace!(layer = %layer.name, kind = other, "skipping unsupported layer");
                    continue;
                }
            };
            layers.push(Layer {
                name: layer.name,
                data,
            });
        }

        Ok(Self {
            width: raw.width,
            height: raw.height,
            tile_width: raw.tilewidth,
            tile_height: raw.tileheight,
            tilesets,
            layers,
        })
    }

    /// Map size in pixels.
    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.tile_width as f32,
            self.height as f32 * self.tile_height as f32,
        )
    }

    /// Generate tile quads and collect objects.
    ///
    /// `layer_names` selects tile layers by name; an empty list or one that
    /// contains [`layers::ALL`] selects every tile layer. Object groups are
    /// always collected. Quads are centered on the map's middle with y up,
    /// in map pixels, and UVs index into an atlas of `texture_size` pixels.
    pub fn build(&self, layer_names: &[String], texture_size: Vec2) -> Result<TiledGeometry, VisualError> {
        if texture_size.x <= 0.0 || texture_size.y <= 0.0 {
            return Err(VisualError::invalid("tiled map needs a non-empty texture"));
        }
        let select_all = layer_names.is_empty() || layer_names.iter().any(|n| n == layers::ALL);

        let tw = self.tile_width as f32;
        let th = self.tile_height as f32;
        let half = self.pixel_size() / 2.0;
        let uv_step = Vec2::new(tw / texture_size.x, th / texture_size.y);

        let mut geometry = TiledGeometry::default();
        for layer in &self.layers {
            match &layer.data {
                LayerData::Tiles(data) => {
                    if !select_all && !layer_names.iter().any(|n| *n == layer.name) {
                        continue;
                    }
                    for (cell, &raw_gid) in data.iter().enumerate() {
                        let gid = raw_gid & GID_MASK;
                        if gid == 0 {
                            continue;
                        }
                        let col = (cell as u32 % self.width) as f32;
                        let row = (cell as u32 / self.width) as f32;

                        let (first_gid, columns) = self.tileset_for(gid, texture_size);
                        let local = gid.checked_sub(first_gid).ok_or_else(|| VisualError::TiledParse {
                            details: format!("gid {gid} precedes the first tileset"),
                        })?;
                        let uv0 = Vec2::new((local % columns) as f32, (local / columns) as f32) * uv_step;
                        let uv1 = uv0 + uv_step;

                        let left = col * tw - half.x;
                        let top = half.y - row * th;
                        geometry.tiles.push(TileQuad {
                            pos: [
                                Vec3::new(left, top, 0.0),
                                Vec3::new(left + tw, top - th, 0.0),
                                Vec3::new(left, top - th, 0.0),
                                Vec3::new(left + tw, top, 0.0),
                            ],
                            uv: [
                                uv0,
                                uv1,
                                Vec2::new(uv0.x, uv1.y),
                                Vec2::new(uv1.x, uv0.y),
                            ],
                        });
                    }
                }
                LayerData::Objects(objects) => {
                    for object in objects {
                        if layer.name == layers::COLLISION {
                            geometry.collision_boxes.push(CollisionBox {
                                position: object.position,
                                size: object.size,
                            });
                        }
                        geometry.objects.push((layer.name.clone(), object.clone()));
                    }
                }
            }
        }
        Ok(geometry)
    }

    /// `(first_gid, atlas columns)` of the tileset owning `gid`.
    fn tileset_for(&self, gid: u32, texture_size: Vec2) -> (u32, u32) {
        let derived = ((texture_size.x / self.tile_width as f32) as u32).max(1);
        self.tilesets
            .iter()
            .rev()
            .find(|t| t.first_gid <= gid)
            .map(|t| (t.first_gid, t.columns.unwrap_or(derived)))
            .unwrap_or((1, derived))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
