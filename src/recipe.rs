//! Campaign recipes: the in-crate analog of the source's per-symbol-class
//! collision scripts (`collide.py`'s `dynamic_ctor_dtors`, `unwinds`,
//! `strlits`, `vftables`, `class_funcs`). A recipe is a named function from
//! (address records, known names) to a ready-to-run [`Campaign`],
//! demonstrating the chained-campaign pattern from spec §9: later recipes
//! build their part alphabets from names an earlier campaign already
//! resolved.
//!
//! Only the constructor/destructor pair is implemented here — the first two
//! `collide()` calls of `class_funcs()`, the simplest of the five script
//! families in the source. The rest of `class_funcs()` and the other four
//! families (`dynamic_ctor_dtors`, `unwinds`, `strlits`, `vftables`) depend
//! on domain-specific mangling tables the spec treats as out-of-scope
//! collaborators and are not reimplemented.

use crate::address_dump::{segs, AddressRecord, Segment};
use crate::campaign::Campaign;
use crate::error::EngineError;
use crate::known_names::KnownNames;
use crate::parts::{singleton, Part};

/// Default tunables a recipe hands to [`Campaign::new`] unless the caller
/// overrides them.
#[derive(Debug, Clone, Copy)]
pub struct RecipeDefaults {
    pub num_threads: usize,
    pub batch_size: u64,
    pub lookup_size: u64,
}

impl Default for RecipeDefaults {
    fn default() -> Self {
        RecipeDefaults { num_threads: 0, batch_size: 1 << 26, lookup_size: 1 << 30 }
    }
}

pub trait Recipe {
    fn name(&self) -> &'static str;

    /// Build a campaign from the parsed address records and the known-names
    /// map accumulated so far. Returns `None` when the recipe has no class
    /// names to search over yet (e.g. no vftable names have been resolved).
    fn build(
        &self,
        records: &[AddressRecord],
        known: &KnownNames,
        defaults: RecipeDefaults,
    ) -> Option<Result<Campaign, EngineError>>;
}

/// Class names recovered so far, derived from already-known vftable names of
/// the form `??_7<ClassName>@@6B@` (source: `collide.py::class_funcs`).
fn known_class_names(known: &KnownNames) -> Vec<Vec<u8>> {
    let mut names: Vec<Vec<u8>> = Vec::new();
    for name in known.iter_names() {
        if let Some(rest) = name.strip_prefix("??_7") {
            if let Some(class_name) = rest.strip_suffix("@@6B@") {
                names.push(class_name.as_bytes().to_vec());
            }
        }
    }
    names
}

fn calling_convention_part(letters: &str) -> Part {
    letters.bytes().map(|b| vec![b]).collect()
}

/// `??0<Class>@@<AIQ>EAA@XZ` — in-class, in-class-hierarchy, and
/// private-access constructor thunk names.
pub struct ConstructorRecipe;

impl Recipe for ConstructorRecipe {
    fn name(&self) -> &'static str {
        "ctor"
    }

    fn build(
        &self,
        records: &[AddressRecord],
        known: &KnownNames,
        defaults: RecipeDefaults,
    ) -> Option<Result<Campaign, EngineError>> {
        let class_names = known_class_names(known);
        if class_names.is_empty() {
            return None;
        }
        let targets = known.filter_unknown(&segs(records, &[Segment::Code]));
        let parts = vec![
            singleton("??0"),
            class_names,
            singleton("@@"),
            calling_convention_part("AIQ"),
            singleton("EAA@XZ"),
        ];
        Some(Campaign::new(targets, parts, defaults.num_threads, defaults.batch_size, defaults.lookup_size))
    }
}

/// `??1<Class>@@<AIQEMU>EAA@XZ` — as above, wider calling-convention set
/// (destructors are virtual more often, hence `EMU` in addition to `AIQ`).
pub struct DestructorRecipe;

impl Recipe for DestructorRecipe {
    fn name(&self) -> &'static str {
        "dtor"
    }

    fn build(
        &self,
        records: &[AddressRecord],
        known: &KnownNames,
        defaults: RecipeDefaults,
    ) -> Option<Result<Campaign, EngineError>> {
        let class_names = known_class_names(known);
        if class_names.is_empty() {
            return None;
        }
        let targets = known.filter_unknown(&segs(records, &[Segment::Code]));
        let parts = vec![
            singleton("??1"),
            class_names,
            singleton("@@"),
            calling_convention_part("AIQEMU"),
            singleton("EAA@XZ"),
        ];
        Some(Campaign::new(targets, parts, defaults.num_threads, defaults.batch_size, defaults.lookup_size))
    }
}

/// The small registry of built-in recipes, in the order the source's
/// orchestration script ran them.
pub fn builtin_recipes() -> Vec<Box<dyn Recipe>> {
    vec![Box::new(ConstructorRecipe), Box::new(DestructorRecipe)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_class_names_yields_no_campaign() {
        let known = KnownNames::new();
        let defaults = RecipeDefaults::default();
        assert!(ConstructorRecipe.build(&[], &known, defaults).is_none());
        assert!(DestructorRecipe.build(&[], &known, defaults).is_none());
    }

    #[test]
    fn class_name_extracted_from_known_vftable() {
        let mut known = KnownNames::new();
        known.merge_confirmed(&[b"??_7CEntity@@6B@".to_vec()]);
        let defaults = RecipeDefaults::default();

        let ctor = ConstructorRecipe.build(&[], &known, defaults).unwrap().unwrap();
        assert!(ctor.parts()[1].contains(&b"CEntity".to_vec()));
        assert_eq!(ctor.parts()[0], vec![b"??0".to_vec()]);

        let dtor = DestructorRecipe.build(&[], &known, defaults).unwrap().unwrap();
        assert!(dtor.parts()[1].contains(&b"CEntity".to_vec()));
        assert_eq!(dtor.parts()[3].len(), 6); // "AIQEMU"
    }

    #[test]
    fn registry_lists_both_recipes_in_order() {
        let names: Vec<&str> = builtin_recipes().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["ctor", "dtor"]);
    }
}
