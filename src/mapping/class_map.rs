//! Class maps: member and reference bindings for one record type

use super::member_map::MemberMap;
use super::reflect::{type_info, Mappable, MemberShape, ReferenceAccessor, TypeInfo};
use crate::error::{CsvError, CsvResult};
use crate::validation::TypeChainGuard;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;

/// Deepest reference chain automatic mapping expands
pub const MAX_REFERENCE_DEPTH: usize = 32;

/// Binding of a composite member to the class map of its type
#[derive(Clone)]
pub struct ReferenceMap {
    member: &'static str,
    accessor: ReferenceAccessor,
    map: ClassMap,
}

impl fmt::Debug for ReferenceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceMap")
            .field("member", &self.member)
            .field("map", &self.map)
            .finish()
    }
}

impl ReferenceMap {
    pub fn member(&self) -> &'static str {
        self.member
    }

    pub fn accessor(&self) -> &ReferenceAccessor {
        &self.accessor
    }

    pub fn map(&self) -> &ClassMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut ClassMap {
        &mut self.map
    }

    /// Prepend `prefix` to every header name of the referenced members
    pub fn prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.map.apply_prefix(&prefix.into());
        self
    }
}

/// Mapping between a record type's members and columns
#[derive(Clone)]
pub struct ClassMap {
    type_info: TypeInfo,
    member_maps: Vec<MemberMap>,
    reference_maps: Vec<ReferenceMap>,
}

impl fmt::Debug for ClassMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMap")
            .field("type", &self.type_info.name)
            .field("member_maps", &self.member_maps)
            .field("reference_maps", &self.reference_maps)
            .finish()
    }
}

fn split_path(path: &str) -> CsvResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(CsvError::configuration(format!(
            "'{}' is not a valid member path",
            path
        )));
    }
    Ok(segments)
}

fn join_path(parent: &str, member: &str) -> String {
    if parent.is_empty() {
        member.to_string()
    } else {
        format!("{}.{}", parent, member)
    }
}

impl ClassMap {
    /// Empty map for `T`
    pub fn new<T: Mappable>() -> Self {
        Self::from_info(type_info::<T>())
    }

    /// Map for `T` with every described member bound automatically
    pub fn auto<T: Mappable>() -> Self {
        let mut map = Self::new::<T>();
        map.auto_map();
        map
    }

    pub fn from_info(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            member_maps: Vec::new(),
            reference_maps: Vec::new(),
        }
    }

    pub fn record_type(&self) -> TypeId {
        self.type_info.id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_info.name
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn member_maps(&self) -> &[MemberMap] {
        &self.member_maps
    }

    pub fn reference_maps(&self) -> &[ReferenceMap] {
        &self.reference_maps
    }

    /// Binding for a member path such as `Address.City`.
    ///
    /// Intermediate segments become reference bindings. Mapping a path a
    /// second time returns the existing binding.
    pub fn map(&mut self, path: &str) -> CsvResult<&mut MemberMap> {
        let segments = split_path(path)?;
        self.map_segments(&segments, path)
    }

    /// Binding for a composite member path
    pub fn reference(&mut self, path: &str) -> CsvResult<&mut ReferenceMap> {
        let segments = split_path(path)?;
        self.reference_segments(&segments, path)
    }

    /// Bind a composite member path with an existing map of its type
    pub fn references(&mut self, path: &str, map: ClassMap) -> CsvResult<&mut ReferenceMap> {
        let reference = self.reference(path)?;
        if reference.accessor.target != map.record_type() {
            return Err(CsvError::configuration(format!(
                "'{}' references {}, not {}",
                path,
                reference.accessor.type_name,
                map.type_name()
            )));
        }
        reference.map = map;
        Ok(reference)
    }

    /// Existing binding for a member path
    pub fn member_map(&self, path: &str) -> Option<&MemberMap> {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments.split_last()?;
        let mut map = self;
        for segment in parents {
            map = &map.reference_maps.iter().find(|r| r.member == *segment)?.map;
        }
        map.member_maps.iter().find(|m| m.data().member == *last)
    }

    fn map_segments(&mut self, segments: &[&str], path: &str) -> CsvResult<&mut MemberMap> {
        let (first, rest) = segments
            .split_first()
            .ok_or_else(|| CsvError::configuration("empty member path"))?;
        if !rest.is_empty() {
            let reference = self.reference_segment(first, path)?;
            return reference.map.map_segments(rest, path);
        }

        if let Some(pos) = self
            .member_maps
            .iter()
            .position(|m| m.data().member == *first)
        {
            return Ok(&mut self.member_maps[pos]);
        }

        let member = self.type_info.find_member(first).ok_or_else(|| {
            CsvError::configuration(format!(
                "{} has no member '{}' (path '{}')",
                self.type_info.name, first, path
            ))
        })?;
        match member.shape {
            MemberShape::Field(accessor) => {
                let pos = self.member_maps.len();
                self.member_maps.push(MemberMap::new(member.name, accessor));
                Ok(&mut self.member_maps[pos])
            }
            MemberShape::Reference(_) => Err(CsvError::configuration(format!(
                "'{}' is a reference; map one of its members instead",
                path
            ))),
        }
    }

    fn reference_segments(
        &mut self,
        segments: &[&str],
        path: &str,
    ) -> CsvResult<&mut ReferenceMap> {
        let (first, rest) = segments
            .split_first()
            .ok_or_else(|| CsvError::configuration("empty member path"))?;
        let reference = self.reference_segment(first, path)?;
        if rest.is_empty() {
            Ok(reference)
        } else {
            reference.map.reference_segments(rest, path)
        }
    }

    fn reference_segment(&mut self, name: &str, path: &str) -> CsvResult<&mut ReferenceMap> {
        if let Some(pos) = self.reference_maps.iter().position(|r| r.member == name) {
            return Ok(&mut self.reference_maps[pos]);
        }

        let member = self.type_info.find_member(name).ok_or_else(|| {
            CsvError::configuration(format!(
                "{} has no member '{}' (path '{}')",
                self.type_info.name, name, path
            ))
        })?;
        match member.shape {
            MemberShape::Reference(accessor) => {
                let map = ClassMap::from_info(accessor.child_info());
                let pos = self.reference_maps.len();
                self.reference_maps.push(ReferenceMap {
                    member: member.name,
                    accessor,
                    map,
                });
                Ok(&mut self.reference_maps[pos])
            }
            MemberShape::Field(_) => Err(CsvError::configuration(format!(
                "'{}' in '{}' is not a reference",
                name, path
            ))),
        }
    }

    /// Bind every described member not bound yet.
    ///
    /// Scalars are named after the member; a name already used elsewhere
    /// in the map tree falls back to the dotted access path. References are
    /// expanded recursively unless their type is already on the access
    /// chain or the chain is too deep.
    pub fn auto_map(&mut self) {
        let mut guard = TypeChainGuard::new(MAX_REFERENCE_DEPTH);
        let mut used = HashSet::new();
        self.collect_header_names(&mut used);
        if let Err(reason) = guard.enter(self.type_info.id, self.type_info.name, "") {
            log::warn!("cannot auto map {}: {}", self.type_info.name, reason);
            return;
        }
        self.auto_map_level(&mut guard, &mut used, "");
        log::debug!(
            "auto mapped {}: {} members, {} references",
            self.type_info.name,
            self.member_maps.len(),
            self.reference_maps.len()
        );
    }

    fn auto_map_level(
        &mut self,
        guard: &mut TypeChainGuard,
        used: &mut HashSet<String>,
        path: &str,
    ) {
        let members = self.type_info.all_members();

        for member in &members {
            let MemberShape::Field(accessor) = &member.shape else {
                continue;
            };
            if self.member_maps.iter().any(|m| m.data().member == member.name) {
                continue;
            }
            let member_path = join_path(path, member.name);
            let header = if used.insert(member.name.to_string()) {
                member.name.to_string()
            } else {
                used.insert(member_path.clone());
                member_path
            };
            let mut map = MemberMap::new(member.name, accessor.clone());
            map.data_mut().names = vec![header];
            self.member_maps.push(map);
        }

        for member in &members {
            let MemberShape::Reference(accessor) = &member.shape else {
                continue;
            };
            let member_path = join_path(path, member.name);
            let child = accessor.child_info();
            if let Err(reason) = guard.enter(child.id, child.name, &member_path) {
                log::debug!(
                    "auto map of {} skips '{}': {}",
                    self.type_info.name,
                    member_path,
                    reason
                );
                continue;
            }

            let pos = match self.reference_maps.iter().position(|r| r.member == member.name) {
                Some(pos) => pos,
                None => {
                    self.reference_maps.push(ReferenceMap {
                        member: member.name,
                        accessor: accessor.clone(),
                        map: ClassMap::from_info(child),
                    });
                    self.reference_maps.len() - 1
                }
            };
            self.reference_maps[pos]
                .map
                .auto_map_level(guard, used, &member_path);
            guard.leave();
        }
    }

    fn collect_header_names(&self, used: &mut HashSet<String>) {
        for member in &self.member_maps {
            used.extend(member.data().names.iter().cloned());
        }
        for reference in &self.reference_maps {
            reference.map.collect_header_names(used);
        }
    }

    fn apply_prefix(&mut self, prefix: &str) {
        for member in &mut self.member_maps {
            let data = member.data_mut();
            data.names = data
                .names
                .iter()
                .map(|name| format!("{}{}", prefix, name))
                .collect();
            data.is_name_set = true;
        }
        for reference in &mut self.reference_maps {
            reference.map.apply_prefix(prefix);
        }
    }

    /// Give members without an explicit index sequential indexes starting
    /// at `start`, members first and then references depth-first. Returns
    /// the next free index.
    pub fn reindex(&mut self, start: usize) -> usize {
        for (offset, member) in self.member_maps.iter_mut().enumerate() {
            let data = member.data_mut();
            if !data.is_index_set {
                data.index = start + offset;
            }
        }
        let mut next = start + self.member_maps.len();
        for reference in &mut self.reference_maps {
            next = reference.map.reindex(next);
        }
        next
    }

    /// Column index and header name of every written member, in column order
    pub fn header_columns(&self) -> Vec<(usize, String)> {
        let mut columns = Vec::new();
        self.collect_header_columns(&mut columns);
        columns.sort_by_key(|(index, _)| *index);
        columns
    }

    fn collect_header_columns(&self, columns: &mut Vec<(usize, String)>) {
        for member in &self.member_maps {
            let data = member.data();
            if data.ignore {
                continue;
            }
            // a collection bound to a closed index range owns every column in it
            let width = match data.index_end {
                Some(end) if member.is_collection() && end >= data.index => end - data.index + 1,
                _ => 1,
            };
            for offset in 0..width {
                columns.push((data.index + offset, member.header_name().to_string()));
            }
        }
        for reference in &self.reference_maps {
            reference.map.collect_header_columns(columns);
        }
    }

    /// Number of non-ignored member bindings in the tree
    pub fn column_count(&self) -> usize {
        self.member_maps.iter().filter(|m| !m.data().ignore).count()
            + self
                .reference_maps
                .iter()
                .map(|r| r.map.column_count())
                .sum::<usize>()
    }
}
