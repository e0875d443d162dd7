#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Reelspin adapters.
//!
//! Reels mirror their tiles onto a [`SceneSurface`], which resolves every
//! symbol to a texture path and keeps a renderer-agnostic snapshot that
//! backends draw from. Backends never talk to the reel system directly.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    time::Duration,
};

use anyhow::{Context, Result as AnyResult};
use glam::Vec2;
use log::{debug, warn};
use reelspin_core::{ReelConfig, SymbolId, SymbolPalette, TileIndex, TileSurface};
use serde::Deserialize;
use thiserror::Error;

/// Directory searched for symbol textures the manifest does not list.
pub const DEFAULT_TEXTURE_DIR: &str = "assets/images";

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

const SYMBOL_COLORS: [Color; 5] = [
    Color::from_rgb_u8(214, 69, 65),
    Color::from_rgb_u8(244, 179, 80),
    Color::from_rgb_u8(63, 195, 128),
    Color::from_rgb_u8(65, 131, 215),
    Color::from_rgb_u8(155, 89, 182),
];

/// Flat color drawn for a symbol whose texture could not be loaded.
///
/// Colors repeat every five symbols and lighten on each repetition so that
/// larger palettes stay distinguishable.
#[must_use]
pub fn symbol_color(symbol: SymbolId) -> Color {
    let index = symbol.get() as usize;
    let base = SYMBOL_COLORS[index % SYMBOL_COLORS.len()];
    let round = (index / SYMBOL_COLORS.len()) as f32;
    base.lighten((round * 0.25).min(0.75))
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FrameInput {
    /// Whether the spin button or a spin shortcut was activated on this frame.
    pub spin_requested: bool,
}

/// Mapping from symbol texture names to image files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureManifest {
    base: PathBuf,
    entries: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    version: u32,
    #[serde(default)]
    symbols: BTreeMap<String, PathBuf>,
}

impl TextureManifest {
    /// Manifest format version understood by this crate.
    pub const VERSION: u32 = 1;

    /// Manifest that lists no textures; every lookup falls back.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses manifest `contents`, resolving relative entries against `base`.
    pub fn parse(contents: &str, base: impl Into<PathBuf>) -> Result<Self, RenderingError> {
        let file: ManifestFile =
            toml::from_str(contents).map_err(|error| RenderingError::ManifestSyntax {
                message: error.to_string(),
            })?;

        if file.version != Self::VERSION {
            return Err(RenderingError::UnsupportedManifestVersion {
                found: file.version,
            });
        }

        if let Some((name, _)) = file
            .symbols
            .iter()
            .find(|(_, path)| path.as_os_str().is_empty())
        {
            return Err(RenderingError::EmptyTexturePath { name: name.clone() });
        }

        Ok(Self {
            base: base.into(),
            entries: file.symbols,
        })
    }

    /// Reads and parses the manifest stored at `path`.
    ///
    /// Entries are resolved relative to the directory holding the manifest.
    pub fn load(path: &Path) -> AnyResult<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read texture manifest {}", path.display()))?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&contents, base)
            .with_context(|| format!("invalid texture manifest {}", path.display()))
    }

    /// Path registered for the texture `name`, if any.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.entries.get(name).map(|path| self.base.join(path))
    }

    /// Number of textures listed in the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the manifest lists no textures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a symbol texture path was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSource {
    /// The path was listed in the texture manifest.
    Manifest,
    /// The path was derived from the fallback texture directory.
    Fallback,
}

/// Texture resolved for a symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SymbolTexture {
    /// Conventional texture name, such as `symbol1.png`.
    pub name: String,
    /// File the backend should load.
    pub path: PathBuf,
    /// Whether the manifest or the fallback directory supplied the path.
    pub source: TextureSource,
}

/// Resolves symbols to textures, preferring the manifest over the fallback
/// directory.
///
/// Clones share their fallback bookkeeping, so a machine with many reels warns
/// about each missing texture once.
#[derive(Clone, Debug)]
pub struct SymbolSkin {
    palette: SymbolPalette,
    manifest: Rc<TextureManifest>,
    fallback_dir: PathBuf,
    warned: Rc<RefCell<HashSet<SymbolId>>>,
}

impl SymbolSkin {
    /// Creates a skin for `palette` backed by `manifest`.
    #[must_use]
    pub fn new(palette: SymbolPalette, manifest: TextureManifest) -> Self {
        Self {
            palette,
            manifest: Rc::new(manifest),
            fallback_dir: PathBuf::from(DEFAULT_TEXTURE_DIR),
            warned: Rc::new(RefCell::new(HashSet::new())),
        }
    }

    /// Replaces the directory used when the manifest lacks a texture.
    #[must_use]
    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = dir.into();
        self
    }

    /// Resolves the texture for `symbol`.
    ///
    /// Falling back to the texture directory is logged once per symbol across
    /// every clone of the skin.
    pub fn resolve(&self, symbol: SymbolId) -> SymbolTexture {
        let name = self.palette.texture_name(symbol);
        if let Some(path) = self.manifest.resolve(&name) {
            return SymbolTexture {
                name,
                path,
                source: TextureSource::Manifest,
            };
        }

        let path = self.fallback_dir.join(&name);
        if self.warned.borrow_mut().insert(symbol) {
            warn!(
                "texture {name} missing from manifest, falling back to {}",
                path.display()
            );
        }
        SymbolTexture {
            name,
            path,
            source: TextureSource::Fallback,
        }
    }
}

/// Snapshot of a single tile as it should appear on screen.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePresentation {
    /// Tile the snapshot belongs to.
    pub tile: TileIndex,
    /// Center of the tile relative to the reel origin.
    pub center: Vec2,
    /// Edge length of the square tile.
    pub size: f32,
    /// Symbol currently shown.
    pub symbol: SymbolId,
    /// Texture resolved for the symbol.
    pub texture: SymbolTexture,
}

/// Tile surface that records renderer-agnostic tile snapshots.
#[derive(Clone, Debug)]
pub struct SceneSurface {
    skin: SymbolSkin,
    tiles: Vec<Option<TilePresentation>>,
}

impl SceneSurface {
    /// Creates an empty surface resolving textures through `skin`.
    #[must_use]
    pub fn new(skin: SymbolSkin) -> Self {
        Self {
            skin,
            tiles: Vec::new(),
        }
    }

    /// Live tiles in index order.
    pub fn tiles(&self) -> impl Iterator<Item = &TilePresentation> {
        self.tiles.iter().flatten()
    }

    /// Snapshot of `tile`, if it exists.
    #[must_use]
    pub fn tile(&self, tile: TileIndex) -> Option<&TilePresentation> {
        self.tiles.get(tile.as_usize()).and_then(Option::as_ref)
    }

    fn tile_mut(&mut self, tile: TileIndex) -> Option<&mut TilePresentation> {
        let slot = self.tiles.get_mut(tile.as_usize()).and_then(Option::as_mut);
        if slot.is_none() {
            debug!("surface update for unknown tile {}", tile.get());
        }
        slot
    }
}

impl TileSurface for SceneSurface {
    fn create_tile(&mut self, tile: TileIndex, symbol: SymbolId, size: f32) {
        let texture = self.skin.resolve(symbol);
        let index = tile.as_usize();
        if self.tiles.len() <= index {
            self.tiles.resize(index + 1, None);
        }
        self.tiles[index] = Some(TilePresentation {
            tile,
            center: Vec2::ZERO,
            size,
            symbol,
            texture,
        });
    }

    fn set_position(&mut self, tile: TileIndex, x: f32, y: f32) {
        if let Some(presentation) = self.tile_mut(tile) {
            presentation.center = Vec2::new(x, y);
        }
    }

    fn set_symbol(&mut self, tile: TileIndex, symbol: SymbolId) {
        let texture = self.skin.resolve(symbol);
        if let Some(presentation) = self.tile_mut(tile) {
            presentation.symbol = symbol;
            presentation.texture = texture;
        }
    }

    fn release_tile(&mut self, tile: TileIndex) {
        if let Some(slot) = self.tiles.get_mut(tile.as_usize()) {
            *slot = None;
        }
    }
}

/// Masked window of a single reel together with its tiles.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelPresentation {
    /// Top-left corner of the reel window in scene units.
    pub origin: Vec2,
    /// Width and height of the visible window.
    pub window: Vec2,
    /// Tiles positioned relative to `origin`, including hidden ones.
    pub tiles: Vec<TilePresentation>,
}

impl ReelPresentation {
    /// Captures the tiles recorded by `surface` for a reel laid out by `config`.
    #[must_use]
    pub fn capture(origin: Vec2, config: &ReelConfig, surface: &SceneSurface) -> Self {
        Self {
            origin,
            window: Vec2::new(config.visible_width(), config.cell_size()),
            tiles: surface.tiles().cloned().collect(),
        }
    }

    /// Horizontal span `(start, end)` of `tile` that falls inside the window,
    /// in reel-local units. Returns `None` when the tile is fully masked.
    #[must_use]
    pub fn visible_span(&self, tile: &TilePresentation) -> Option<(f32, f32)> {
        let half = tile.size * 0.5;
        let start = (tile.center.x - half).max(0.0);
        let end = (tile.center.x + half).min(self.window.x);
        (end > start).then_some((start, end))
    }
}

/// State of the spin button drawn beneath the reels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpinButtonPresentation {
    /// Whether a click would start a new spin.
    pub enabled: bool,
}

/// Complete description of what a backend should draw on a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Reels in top-to-bottom order.
    pub reels: Vec<ReelPresentation>,
    /// Translucent panel drawn behind the reels.
    pub backdrop: Color,
    /// Distance the backdrop extends beyond the reel windows.
    pub backdrop_margin: f32,
    /// Spin button state.
    pub spin_button: SpinButtonPresentation,
}

impl Scene {
    /// Creates a new scene description.
    #[must_use]
    pub fn new(
        reels: Vec<ReelPresentation>,
        backdrop: Color,
        backdrop_margin: f32,
        spin_button: SpinButtonPresentation,
    ) -> Self {
        Self {
            reels,
            backdrop,
            backdrop_margin,
            spin_button,
        }
    }

    /// Bottom-right corner of the union of every reel window.
    #[must_use]
    pub fn reel_extent(&self) -> Vec2 {
        self.reels
            .iter()
            .map(|reel| reel.origin + reel.window)
            .fold(Vec2::ZERO, Vec2::max)
    }
}

/// Description of the scene handed to a backend along with window metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title of the window.
    pub window_title: String,
    /// Color used to clear the window before drawing.
    pub clear_color: Color,
    /// Scene drawn on the first frame.
    pub scene: Scene,
}

impl Presentation {
    /// Creates a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Reelspin scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the elapsed frame time and
    /// per-frame input captured by the adapter, and refreshes the scene before
    /// it is rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RenderingError {
    /// The texture manifest is not valid TOML or has an unexpected shape.
    #[error("texture manifest is malformed: {message}")]
    ManifestSyntax {
        /// Parser diagnostic.
        message: String,
    },
    /// The texture manifest declares a version this crate cannot read.
    #[error("unsupported texture manifest version {found} (expected {})", TextureManifest::VERSION)]
    UnsupportedManifestVersion {
        /// Version found in the manifest.
        found: u32,
    },
    /// A manifest entry maps a texture name to an empty path.
    #[error("texture {name} has an empty path")]
    EmptyTexturePath {
        /// Texture name with the empty entry.
        name: String,
    },
}
