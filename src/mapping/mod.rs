//! Record type descriptions and their column mappings

pub mod class_map;
pub mod collection;
pub mod member_map;
pub mod reflect;

pub use class_map::{ClassMap, ReferenceMap, MAX_REFERENCE_DEPTH};
pub use collection::{ClassMapCollection, RecordMap, ResolvedMap};
pub use member_map::{FieldValidator, MemberMap, MemberMapData};
pub use reflect::{
    type_info, FieldAccessor, Mappable, MemberInfo, MemberShape, ReferenceAccessor, TypeDescriptor,
    TypeInfo, Upcast,
};
