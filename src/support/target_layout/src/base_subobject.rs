use crate::TypeLayoutCache;
use arena::{Arena, Idx, new_id_with_niche};
use asg::RecordRef;
use indexmap::IndexMap;
use std::ops::Index;

new_id_with_niche!(BaseSubobjectId, u32);

pub type BaseSubobjectRef = Idx<BaseSubobjectId, BaseSubobjectInfo>;

/// One occurrence of a base class inside the class being laid out.
///
/// A non-virtual base appears once per path that inherits it, while a virtual
/// base has a single occurrence shared by every path.
#[derive(Clone, Debug)]
pub struct BaseSubobjectInfo {
    pub class: RecordRef,
    pub is_virtual: bool,
    pub bases: Vec<BaseSubobjectRef>,

    /// The virtual base that this occurrence uses as its primary base, if it claimed one
    pub primary_virtual_base_info: Option<BaseSubobjectRef>,

    /// For a virtual base, the occurrence that claimed it as its primary virtual base
    pub derived: Option<BaseSubobjectRef>,
}

/// Subobject graph for the bases of a single class.
#[derive(Debug)]
pub struct BaseSubobjects {
    infos: Arena<BaseSubobjectId, BaseSubobjectInfo>,
    virtual_bases: IndexMap<RecordRef, BaseSubobjectRef>,
    non_virtual_bases: IndexMap<RecordRef, BaseSubobjectRef>,
}

impl BaseSubobjects {
    pub fn new() -> Self {
        Self {
            infos: Arena::new(),
            virtual_bases: IndexMap::new(),
            non_virtual_bases: IndexMap::new(),
        }
    }

    pub fn compute(cache: &TypeLayoutCache, record: RecordRef) -> Self {
        let mut subobjects = Self::new();

        for base in cache.asg.records[record].bases() {
            let info = subobjects.compute_info(cache, base.record, base.is_virtual);

            if !base.is_virtual {
                let previous = subobjects.non_virtual_bases.insert(base.record, info);
                assert!(previous.is_none(), "non-virtual base already exists");
            }
        }

        subobjects
    }

    fn compute_info(
        &mut self,
        cache: &TypeLayoutCache,
        class: RecordRef,
        is_virtual: bool,
    ) -> BaseSubobjectRef {
        if is_virtual {
            if let Some(existing) = self.virtual_bases.get(&class) {
                return *existing;
            }
        }

        let info = self.infos.alloc(BaseSubobjectInfo {
            class,
            is_virtual,
            bases: Vec::new(),
            primary_virtual_base_info: None,
            derived: None,
        });

        if is_virtual {
            self.virtual_bases.insert(class, info);
        }

        // A primary virtual base that hasn't been seen yet is claimed once the
        // bases below have created it
        let mut unclaimed_primary_virtual_base = None;

        if !cache.asg.virtual_bases(class).is_empty() {
            let layout = cache.get_record_layout(class);

            if let Some(primary) = layout.primary_base().filter(|_| layout.is_primary_base_virtual()) {
                match self.virtual_bases.get(&primary).copied() {
                    Some(primary_info) if self.infos[primary_info].derived.is_some() => (),
                    Some(primary_info) => self.claim(info, primary_info),
                    None => unclaimed_primary_virtual_base = Some(primary),
                }
            }
        }

        for base in cache.asg.records[class].bases() {
            let base_info = self.compute_info(cache, base.record, base.is_virtual);
            self.infos[info].bases.push(base_info);
        }

        if let Some(primary) = unclaimed_primary_virtual_base {
            let primary_info = *self
                .virtual_bases
                .get(&primary)
                .expect("primary virtual base was created while visiting bases");

            self.claim(info, primary_info);
        }

        info
    }

    fn claim(&mut self, info: BaseSubobjectRef, primary_info: BaseSubobjectRef) {
        self.infos[info].primary_virtual_base_info = Some(primary_info);
        self.infos[primary_info].derived = Some(info);
    }

    /// Takes a virtual base away from whichever base claimed it, so that the
    /// class being laid out can use it as its own primary base.
    pub fn steal_virtual_base(&mut self, class: RecordRef) -> BaseSubobjectRef {
        let info = self.virtual_base(class);
        self.infos[info].derived = None;
        info
    }

    pub fn virtual_base(&self, class: RecordRef) -> BaseSubobjectRef {
        *self
            .virtual_bases
            .get(&class)
            .expect("virtual base has subobject info")
    }

    pub fn non_virtual_base(&self, class: RecordRef) -> BaseSubobjectRef {
        *self
            .non_virtual_bases
            .get(&class)
            .expect("non-virtual base has subobject info")
    }

    /// Whether `info` is the occurrence that claimed its primary virtual base.
    pub fn claimed_primary_virtual_base(&self, info: BaseSubobjectRef) -> Option<BaseSubobjectRef> {
        self.infos[info]
            .primary_virtual_base_info
            .filter(|primary| self.infos[*primary].derived == Some(info))
    }
}

impl Default for BaseSubobjects {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<BaseSubobjectRef> for BaseSubobjects {
    type Output = BaseSubobjectInfo;

    fn index(&self, index: BaseSubobjectRef) -> &Self::Output {
        &self.infos[index]
    }
}
