//! Line factories and their registry.
//!
//! A factory turns wire-format parameters into a typed [`XLine`]. The
//! registry maps each one-character tag to exactly one factory so remote
//! servers and configuration can create lines without knowing their kind.

use super::kinds::{UserHostMask, XLine};
use super::LineType;
use crate::error::XLineError;
use crate::matching::ident_split;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Builds lines of one kind from string parameters.
pub trait XLineFactory: Send + Sync {
    fn generate(
        &self,
        set_time: i64,
        duration: i64,
        source: &str,
        reason: &str,
        mask: &str,
    ) -> XLine;

    /// Whether a freshly added line is queued for the enforcement sweep.
    fn auto_apply(&self, _line: &XLine) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct GlineFactory;

impl XLineFactory for GlineFactory {
    fn generate(&self, set_time: i64, duration: i64, source: &str, reason: &str, mask: &str) -> XLine {
        let (ident, host) = ident_split(mask);
        XLine::gline(set_time, duration, source, reason, ident, host)
    }
}

#[derive(Debug, Default)]
pub struct KlineFactory;

impl XLineFactory for KlineFactory {
    fn generate(&self, set_time: i64, duration: i64, source: &str, reason: &str, mask: &str) -> XLine {
        let (ident, host) = ident_split(mask);
        XLine::kline(set_time, duration, source, reason, ident, host)
    }
}

/// E-lines only exempt; there is nothing to sweep.
#[derive(Debug, Default)]
pub struct ElineFactory;

impl XLineFactory for ElineFactory {
    fn generate(&self, set_time: i64, duration: i64, source: &str, reason: &str, mask: &str) -> XLine {
        let UserHostMask {
            identmask, hostmask, ..
        } = UserHostMask::parse(mask);
        XLine::eline(set_time, duration, source, reason, identmask, hostmask)
    }

    fn auto_apply(&self, _line: &XLine) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct ZlineFactory;

impl XLineFactory for ZlineFactory {
    fn generate(&self, set_time: i64, duration: i64, source: &str, reason: &str, mask: &str) -> XLine {
        XLine::zline(set_time, duration, source, reason, mask)
    }
}

#[derive(Debug, Default)]
pub struct QlineFactory;

impl XLineFactory for QlineFactory {
    fn generate(&self, set_time: i64, duration: i64, source: &str, reason: &str, mask: &str) -> XLine {
        XLine::qline(set_time, duration, source, reason, mask)
    }
}

/// Tag to factory map. One factory per tag.
#[derive(Default, Clone)]
pub struct FactoryRegistry {
    factories: HashMap<LineType, Arc<dyn XLineFactory>>,
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<char> = self.factories.keys().map(|t| t.as_char()).collect();
        tags.sort_unstable();
        f.debug_struct("FactoryRegistry").field("tags", &tags).finish()
    }
}

impl FactoryRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the five built-in factories.
    pub fn with_builtin() -> Self {
        let builtin: [(LineType, Arc<dyn XLineFactory>); 5] = [
            (LineType::Gline, Arc::new(GlineFactory)),
            (LineType::Kline, Arc::new(KlineFactory)),
            (LineType::Eline, Arc::new(ElineFactory)),
            (LineType::Zline, Arc::new(ZlineFactory)),
            (LineType::Qline, Arc::new(QlineFactory)),
        ];

        Self {
            factories: builtin.into_iter().collect(),
        }
    }

    /// Register `factory` under `tag`. Fails if the tag is taken.
    pub fn register(
        &mut self,
        tag: LineType,
        factory: Arc<dyn XLineFactory>,
    ) -> Result<(), XLineError> {
        if self.factories.contains_key(&tag) {
            return Err(XLineError::FactoryExists(tag.as_char()));
        }
        debug!(tag = %tag.as_char(), "registered xline factory");
        self.factories.insert(tag, factory);
        Ok(())
    }

    /// Remove the factory for `tag`, only if it is the same instance.
    pub fn unregister(
        &mut self,
        tag: LineType,
        factory: &Arc<dyn XLineFactory>,
    ) -> Result<(), XLineError> {
        match self.factories.get(&tag) {
            Some(current) if std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(factory)) => {
                self.factories.remove(&tag);
                debug!(tag = %tag.as_char(), "unregistered xline factory");
                Ok(())
            }
            Some(_) => Err(XLineError::FactoryMismatch(tag.as_char())),
            None => Err(XLineError::UnregisteredKind(tag.as_char())),
        }
    }

    pub fn get(&self, tag: LineType) -> Option<&Arc<dyn XLineFactory>> {
        self.factories.get(&tag)
    }

    pub fn is_registered(&self, tag: LineType) -> bool {
        self.factories.contains_key(&tag)
    }

    /// Build a line from wire parameters.
    ///
    /// `tag` is the raw character so unknown kinds surface as
    /// [`XLineError::UnregisteredKind`] rather than a parse failure.
    pub fn generate(
        &self,
        tag: char,
        set_time: i64,
        duration: i64,
        source: &str,
        reason: &str,
        mask: &str,
    ) -> Result<XLine, XLineError> {
        let factory = LineType::from_char(tag)
            .and_then(|t| self.factories.get(&t))
            .ok_or(XLineError::UnregisteredKind(tag))?;
        Ok(factory.generate(set_time, duration, source, reason, mask))
    }

    /// Ask the owning factory whether `line` joins the pending queue.
    ///
    /// Lines whose factory has been unregistered are never queued.
    pub fn auto_apply(&self, line: &XLine) -> bool {
        self.factories
            .get(&line.line_type())
            .is_some_and(|f| f.auto_apply(line))
    }
}
