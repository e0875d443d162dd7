use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use macroquad::texture::{FilterMode, Texture2D};
use reelspin_rendering::{SymbolTexture, TextureSource, DEFAULT_TEXTURE_DIR};

/// Lazily populated cache of symbol textures keyed by file path.
///
/// Every path is loaded at most once. Failed loads are remembered so the
/// renderer falls back to flat colored tiles without retrying each frame.
#[derive(Debug)]
pub(crate) struct TextureCache {
    enabled: bool,
    fallback_dir: PathBuf,
    textures: HashMap<PathBuf, Option<Texture2D>>,
}

impl TextureCache {
    /// Creates a cache that loads textures from disk when `enabled`.
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            fallback_dir: PathBuf::from(DEFAULT_TEXTURE_DIR),
            textures: HashMap::new(),
        }
    }

    /// Returns the texture for `texture`, loading it from disk on first use.
    pub(crate) fn texture(&mut self, texture: &SymbolTexture) -> Option<Texture2D> {
        self.texture_with_loader(texture, &mut default_loader)
    }

    fn texture_with_loader(
        &mut self,
        texture: &SymbolTexture,
        loader: &mut impl FnMut(&Path) -> Result<Texture2D>,
    ) -> Option<Texture2D> {
        if !self.enabled {
            return None;
        }

        if let Some(cached) = self.textures.get(&texture.path) {
            return *cached;
        }

        let loaded = self.load_with_fallback(texture, loader);
        let _ = self.textures.insert(texture.path.clone(), loaded);
        loaded
    }

    fn load_with_fallback(
        &self,
        texture: &SymbolTexture,
        loader: &mut impl FnMut(&Path) -> Result<Texture2D>,
    ) -> Option<Texture2D> {
        let primary = match loader(&texture.path) {
            Ok(loaded) => {
                debug!("loaded texture {}", texture.path.display());
                return Some(loaded);
            }
            Err(error) => error,
        };

        if texture.source == TextureSource::Manifest {
            let fallback = self.fallback_dir.join(&texture.name);
            warn!("{primary:#}; retrying with {}", fallback.display());
            match loader(&fallback) {
                Ok(loaded) => return Some(loaded),
                Err(error) => {
                    warn!("{error:#}; drawing {} as a flat tile", texture.name);
                    return None;
                }
            }
        }

        warn!("{primary:#}; drawing {} as a flat tile", texture.name);
        None
    }

    /// Number of paths the cache has attempted to load.
    #[cfg(test)]
    fn attempted(&self) -> usize {
        self.textures.len()
    }
}

fn default_loader(path: &Path) -> Result<Texture2D> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read texture at {}", path.display()))?;
    let texture = Texture2D::from_file_with_format(&bytes, None);
    texture.set_filter(FilterMode::Linear);
    Ok(texture)
}
