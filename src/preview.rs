//! Local preview handles.
//!
//! A [`PreviewHandle`] owns a registered reference to binary content that a
//! playback or download surface can use. The registry entry is released when
//! the handle is dropped, so a handle can be released at most once and is
//! released on every path that stops using it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use bytes::Bytes;

/// What a preview shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Original,
    Transformed,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Original => "original",
            Self::Transformed => "transformed",
        })
    }
}

#[derive(Debug)]
struct Entry {
    role: Role,
    len: usize,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    live: HashMap<u64, Entry>,
    released: u64,
}

/// Book-keeping of live preview handles. Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Rc<RefCell<Registry>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` under `role`.
    pub fn create(&self, role: Role, media_type: &str, data: Bytes) -> PreviewHandle {
        let id = {
            let mut reg = self.inner.borrow_mut();
            reg.next_id += 1;
            let id = reg.next_id;
            reg.live.insert(id, Entry { role, len: data.len() });
            id
        };
        log::debug!("Created {role} preview #{id} ({} bytes)", data.len());
        PreviewHandle {
            id,
            role,
            media_type: media_type.to_string(),
            data,
            registry: self.inner.clone(),
        }
    }

    /// Release whatever `slot` holds, then fill it with a fresh handle.
    pub fn replace(
        &self,
        slot: &mut Option<PreviewHandle>,
        role: Role,
        media_type: &str,
        data: Bytes,
    ) {
        drop(slot.take());
        *slot = Some(self.create(role, media_type, data));
    }

    /// Number of live handles for `role`.
    pub fn live(&self, role: Role) -> usize {
        self.inner
            .borrow()
            .live
            .values()
            .filter(|e| e.role == role)
            .count()
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.inner.borrow().live.contains_key(&id)
    }

    /// Total bytes held by live handles.
    pub fn live_bytes(&self) -> usize {
        self.inner.borrow().live.values().map(|e| e.len).sum()
    }

    /// How many handles have been released so far.
    pub fn released(&self) -> u64 {
        self.inner.borrow().released
    }
}

/// Ownership-bearing reference to previewable content.
pub struct PreviewHandle {
    id: u64,
    role: Role,
    media_type: String,
    data: Bytes,
    registry: Rc<RefCell<Registry>>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Locator the playback surface resolves against the registry.
    pub fn url(&self) -> String {
        format!("preview://{}/{}", self.role, self.id)
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        let mut reg = self.registry.borrow_mut();
        if reg.live.remove(&self.id).is_some() {
            reg.released += 1;
            log::debug!("Released {} preview #{}", self.role, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_releases_exactly_once() {
        let reg = PreviewRegistry::new();
        let handle = reg.create(Role::Original, "audio/wav", Bytes::from_static(b"abc"));
        let id = handle.id();
        assert!(reg.is_live(id));
        assert_eq!(reg.live_bytes(), 3);

        drop(handle);
        assert!(!reg.is_live(id));
        assert_eq!(reg.released(), 1);
        assert_eq!(reg.live_bytes(), 0);
    }

    #[test]
    fn replace_keeps_one_handle_per_role() {
        let reg = PreviewRegistry::new();
        let mut slot = None;
        for i in 0..5u8 {
            reg.replace(&mut slot, Role::Transformed, "audio/wav", Bytes::from(vec![i]));
            assert_eq!(reg.live(Role::Transformed), 1);
        }
        assert_eq!(reg.released(), 4);
        assert_eq!(reg.live(Role::Original), 0);

        slot = None;
        assert_eq!(reg.live(Role::Transformed), 0);
        assert_eq!(reg.released(), 5);
        assert!(slot.is_none());
    }

    #[test]
    fn url_names_role_and_id() {
        let reg = PreviewRegistry::new();
        let handle = reg.create(Role::Transformed, "audio/wav", Bytes::new());
        assert_eq!(handle.url(), format!("preview://transformed/{}", handle.id()));
    }
}
