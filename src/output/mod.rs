//! Output registry
//!
//! Tracks every display the compositor advertises. Entries are created when
//! an output global appears, updated field by field as the compositor streams
//! `wl_output` events, and pruned down to a single entry once the probe has
//! decided where the launcher will be shown.
//!
//! The registry is keyed by the protocol handle of the output. It does no I/O
//! and is generic over the handle type so it can be driven without a
//! compositor.

use log::{debug, trace};

use crate::error::SetupError;

/// Rotation/flip applied to an output, mirroring `wl_output.transform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    Flipped,
    Flipped90,
    Flipped180,
    Flipped270,
}

impl Transform {
    /// Whether the transform swaps the horizontal and vertical axes.
    pub fn is_rotated(&self) -> bool {
        matches!(
            self,
            Transform::Rotate90
                | Transform::Rotate270
                | Transform::Flipped90
                | Transform::Flipped270
        )
    }
}

/// Everything we know about one display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    /// Connector name, empty until reported (or forever, for old outputs).
    pub name: String,
    /// Current mode width in device pixels, before rotation.
    pub width: u32,
    /// Current mode height in device pixels, before rotation.
    pub height: u32,
    pub scale: u32,
    pub transform: Transform,
}

impl Default for OutputInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            width: 0,
            height: 0,
            scale: 1,
            transform: Transform::Normal,
        }
    }
}

impl OutputInfo {
    /// Width and height as seen by the user, i.e. after rotation.
    pub fn logical_size(&self) -> (u32, u32) {
        if self.transform.is_rotated() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// The single output everything is laid out against once probing is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedOutput<K> {
    pub handle: K,
    pub name: String,
    /// Rotation-normalized width used for percentage math.
    pub width: u32,
    /// Rotation-normalized height used for percentage math.
    pub height: u32,
    pub scale: u32,
    pub transform: Transform,
}

/// Registry of advertised outputs keyed by protocol handle.
#[derive(Debug)]
pub struct OutputRegistry<K> {
    entries: Vec<(K, OutputInfo)>,
    /// First output ever advertised; the fallback when nothing better is known.
    first: Option<K>,
}

impl<K> Default for OutputRegistry<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            first: None,
        }
    }
}

impl<K: Clone + PartialEq + std::fmt::Debug> OutputRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an output in its "unknown" state.
    pub fn add(&mut self, handle: K) {
        if self.position(&handle).is_some() {
            return;
        }
        trace!("Output {:?} advertised", handle);
        if self.first.is_none() {
            self.first = Some(handle.clone());
        }
        self.entries.push((handle, OutputInfo::default()));
    }

    pub fn update_geometry(&mut self, handle: &K, width: u32, height: u32) {
        if let Some(info) = self.get_mut(handle) {
            info.width = width;
            info.height = height;
        }
    }

    pub fn update_scale(&mut self, handle: &K, scale: u32) {
        if let Some(info) = self.get_mut(handle) {
            info.scale = scale;
        }
    }

    pub fn update_transform(&mut self, handle: &K, transform: Transform) {
        if let Some(info) = self.get_mut(handle) {
            info.transform = transform;
        }
    }

    pub fn update_name(&mut self, handle: &K, name: &str) {
        if let Some(info) = self.get_mut(handle) {
            info.name = name.to_owned();
        }
    }

    /// Stop tracking an output. Returns its last known state.
    pub fn remove(&mut self, handle: &K) -> Option<OutputInfo> {
        let index = self.position(handle)?;
        let (_, info) = self.entries.remove(index);
        debug!("Output {:?} ({}) removed", handle, info.name);
        Some(info)
    }

    pub fn get(&self, handle: &K) -> Option<&OutputInfo> {
        self.entries.iter().find(|(k, _)| k == handle).map(|(_, info)| info)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handle of the first output that was ever advertised. Once that one is
    /// gone, the oldest surviving output takes its place.
    pub fn first_advertised(&self) -> Option<&K> {
        self.first
            .as_ref()
            .filter(|first| self.position(first).is_some())
            .or_else(|| self.entries.first().map(|(k, _)| k))
    }

    /// Handle of the output with the given connector name.
    pub fn find_by_name(&self, name: &str) -> Option<&K> {
        self.entries
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(k, _)| k)
    }

    /// Pick the output to render on.
    ///
    /// A requested name must match a registered output. Without one, the
    /// output the probe surface entered wins, falling back to the first
    /// output that was advertised.
    pub fn resolve_target(&self, requested: &str, entered: Option<&K>) -> Result<K, SetupError> {
        if self.entries.is_empty() {
            return Err(SetupError::NoOutputs);
        }
        if !requested.is_empty() {
            return self
                .find_by_name(requested)
                .cloned()
                .ok_or_else(|| SetupError::OutputNotFound(requested.to_owned()));
        }
        if let Some(entered) = entered.filter(|k| self.position(k).is_some()) {
            return Ok(entered.clone());
        }
        self.first_advertised()
            .cloned()
            .ok_or(SetupError::NoOutputs)
    }

    /// Drop every entry except `target` and hand the dropped ones back so the
    /// caller can release their protocol objects.
    pub fn retain_only(&mut self, target: &K) -> Vec<(K, OutputInfo)> {
        let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(k, _)| k == target);
        self.entries = kept;
        if self.entries.is_empty() {
            self.first = None;
        } else {
            self.first = Some(target.clone());
        }
        removed
    }

    /// Finalize the selection, normalizing the size for rotated outputs.
    pub fn selected(&self, target: &K) -> Option<SelectedOutput<K>> {
        let info = self.get(target)?;
        let (width, height) = info.logical_size();
        Some(SelectedOutput {
            handle: target.clone(),
            name: info.name.clone(),
            width,
            height,
            scale: info.scale.max(1),
            transform: info.transform,
        })
    }

    fn position(&self, handle: &K) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == handle)
    }

    fn get_mut(&mut self, handle: &K) -> Option<&mut OutputInfo> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == handle)
            .map(|(_, info)| info)
    }
}
