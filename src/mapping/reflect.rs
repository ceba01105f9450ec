//! Type descriptions for mappable record types
//!
//! A record type describes its members once through a [`TypeDescriptor`].
//! The description is compiled into type-erased accessors that the record
//! pipeline uses to read and populate instances.

use crate::conversion::{FieldValue, Value, ValueKind};
use std::any::{Any, TypeId};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A record type that can be mapped to columns
///
/// ```
/// use csvmap::mapping::{Mappable, TypeDescriptor};
///
/// #[derive(Default)]
/// struct Person {
///     id: i32,
///     name: String,
/// }
///
/// impl Mappable for Person {
///     fn describe(d: &mut TypeDescriptor<Self>) {
///         d.default_constructor();
///         d.field("Id", |p| &p.id, |p, v| p.id = v);
///         d.field("Name", |p| &p.name, |p, v| p.name = v);
///     }
/// }
/// ```
pub trait Mappable: Any + Sized {
    fn describe(d: &mut TypeDescriptor<Self>);
}

type ValueGetter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type ValueSetter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), String> + Send + Sync>;
type RefGetter = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;
type RefGetterMut = Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;
type Installer = Arc<dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<(), String> + Send + Sync>;
type Constructor = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

fn ref_getter<F>(f: F) -> RefGetter
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn ref_getter_mut<F>(f: F) -> RefGetterMut
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compiled description of a record type
#[derive(Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: &'static str,
    pub members: Vec<MemberInfo>,
    pub parents: Vec<ParentInfo>,
    constructor: Option<Constructor>,
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("parents", &self.parents.iter().map(|p| p.name).collect::<Vec<_>>())
            .field("constructible", &self.constructor.is_some())
            .finish()
    }
}

/// Describe `T` and compile its accessors
pub fn type_info<T: Mappable>() -> TypeInfo {
    let mut descriptor = TypeDescriptor::<T>::new();
    T::describe(&mut descriptor);
    descriptor.info
}

impl TypeInfo {
    /// Create a fresh instance, if the type has a constructor
    pub fn construct(&self) -> Option<Box<dyn Any>> {
        self.constructor.as_ref().map(|make| make())
    }

    pub fn is_constructible(&self) -> bool {
        self.constructor.is_some()
    }

    /// Own member by name
    pub fn own_member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Member by name, searching parent types when not declared here.
    /// Inherited members are returned with accessors that work on `self`.
    pub fn find_member(&self, name: &str) -> Option<MemberInfo> {
        if let Some(member) = self.own_member(name) {
            return Some(member.clone());
        }
        self.parents.iter().find_map(|parent| {
            (parent.info)()
                .find_member(name)
                .map(|member| member.through(&parent.upcast))
        })
    }

    /// Inherited members first, then own members in declaration order.
    /// A member redeclared here hides the parent's member of the same name.
    pub fn all_members(&self) -> Vec<MemberInfo> {
        self.members_along(&mut HashSet::new())
    }

    /// `chain` holds the types being expanded; a parent already on it is
    /// skipped so cyclic `extends` declarations terminate.
    fn members_along(&self, chain: &mut HashSet<TypeId>) -> Vec<MemberInfo> {
        chain.insert(self.id);
        let mut members = Vec::new();
        let mut seen: HashSet<&'static str> = self.members.iter().map(|m| m.name).collect();
        for parent in &self.parents {
            if chain.contains(&parent.id) {
                log::warn!(
                    "{} extends {} which is already being expanded, skipping its members",
                    self.name,
                    parent.name
                );
                continue;
            }
            for member in (parent.info)().members_along(chain) {
                if seen.insert(member.name) {
                    members.push(member.through(&parent.upcast));
                }
            }
        }
        chain.remove(&self.id);
        members.extend(self.members.iter().cloned());
        members
    }

    /// This type followed by its ancestors, breadth-first, each with the
    /// upcast that reaches it from this type
    pub fn lineage(&self) -> Vec<Ancestor> {
        let mut lineage = vec![Ancestor {
            id: self.id,
            name: self.name,
            upcast: Upcast::identity(),
        }];
        let mut seen = HashSet::from([self.id]);
        let mut queue: VecDeque<(TypeInfo, Upcast)> =
            VecDeque::from([(self.clone(), Upcast::identity())]);

        while let Some((info, upcast)) = queue.pop_front() {
            for parent in &info.parents {
                if !seen.insert(parent.id) {
                    continue;
                }
                let reach = upcast.then(&parent.upcast);
                lineage.push(Ancestor {
                    id: parent.id,
                    name: parent.name,
                    upcast: reach.clone(),
                });
                queue.push_back(((parent.info)(), reach));
            }
        }
        lineage
    }
}

/// Entry of [`TypeInfo::lineage`]
#[derive(Clone)]
pub struct Ancestor {
    pub id: TypeId,
    pub name: &'static str,
    pub upcast: Upcast,
}

/// A described member
#[derive(Clone)]
pub struct MemberInfo {
    pub name: &'static str,
    pub shape: MemberShape,
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            MemberShape::Field(field) => write!(f, "{}: {}", self.name, field.type_name),
            MemberShape::Reference(reference) => {
                write!(f, "{}: &{}", self.name, reference.type_name)
            }
        }
    }
}

impl MemberInfo {
    /// Same member reached through `upcast` from a derived type
    pub fn through(&self, upcast: &Upcast) -> MemberInfo {
        MemberInfo {
            name: self.name,
            shape: match &self.shape {
                MemberShape::Field(field) => MemberShape::Field(field.through(upcast)),
                MemberShape::Reference(reference) => {
                    MemberShape::Reference(reference.through(upcast))
                }
            },
        }
    }
}

#[derive(Clone)]
pub enum MemberShape {
    /// Scalar or collection value converted to and from text
    Field(FieldAccessor),
    /// Composite member mapped through its own members
    Reference(ReferenceAccessor),
}

/// Type-erased access to a scalar member
#[derive(Clone)]
pub struct FieldAccessor {
    pub value_type: TypeId,
    pub inner_type: Option<TypeId>,
    pub type_name: &'static str,
    pub kind: ValueKind,
    get: ValueGetter,
    set: ValueSetter,
}

impl FieldAccessor {
    /// Current value of the member on `owner`
    pub fn get(&self, owner: &dyn Any) -> Option<Value> {
        (self.get)(owner)
    }

    /// Assign `value` to the member on `owner`
    pub fn set(&self, owner: &mut dyn Any, value: Value) -> Result<(), String> {
        (self.set)(owner, value)
    }

    fn through(&self, upcast: &Upcast) -> FieldAccessor {
        let get = self.get.clone();
        let set = self.set.clone();
        let up = upcast.clone();
        let up_mut = upcast.clone();
        FieldAccessor {
            get: Arc::new(move |owner: &dyn Any| up.apply(owner).and_then(|parent| get(parent))),
            set: Arc::new(move |owner: &mut dyn Any, value: Value| match up_mut.apply_mut(owner) {
                Some(parent) => set(parent, value),
                None => Err("owner does not derive from the member's type".to_string()),
            }),
            ..self.clone()
        }
    }
}

/// Type-erased access to a composite member
#[derive(Clone)]
pub struct ReferenceAccessor {
    pub target: TypeId,
    pub type_name: &'static str,
    /// Member may be absent (`Option<C>`)
    pub nullable: bool,
    child: fn() -> TypeInfo,
    get: RefGetter,
    get_mut: RefGetterMut,
    install: Installer,
}

impl ReferenceAccessor {
    /// Description of the referenced type
    pub fn child_info(&self) -> TypeInfo {
        (self.child)()
    }

    pub fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.get)(owner)
    }

    pub fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.get_mut)(owner)
    }

    /// Store a freshly built child in the member
    pub fn install(&self, owner: &mut dyn Any, child: Box<dyn Any>) -> Result<(), String> {
        (self.install)(owner, child)
    }

    fn through(&self, upcast: &Upcast) -> ReferenceAccessor {
        let get = self.get.clone();
        let get_mut = self.get_mut.clone();
        let install = self.install.clone();
        let up = upcast.clone();
        let up_mut = upcast.clone();
        let up_install = upcast.clone();
        ReferenceAccessor {
            get: ref_getter(move |owner| up.apply(owner).and_then(|parent| get(parent))),
            get_mut: ref_getter_mut(move |owner| {
                up_mut.apply_mut(owner).and_then(|parent| get_mut(parent))
            }),
            install: Arc::new(move |owner: &mut dyn Any, child: Box<dyn Any>| {
                match up_install.apply_mut(owner) {
                    Some(parent) => install(parent, child),
                    None => Err("owner does not derive from the member's type".to_string()),
                }
            }),
            ..self.clone()
        }
    }
}

/// Parent type declared with [`TypeDescriptor::extends`]
#[derive(Clone)]
pub struct ParentInfo {
    pub id: TypeId,
    pub name: &'static str,
    info: fn() -> TypeInfo,
    upcast: Upcast,
}

impl ParentInfo {
    pub fn info(&self) -> TypeInfo {
        (self.info)()
    }
}

/// View of a derived instance as one of its ancestors
#[derive(Clone)]
pub struct Upcast {
    get: RefGetter,
    get_mut: RefGetterMut,
}

impl Upcast {
    pub fn identity() -> Self {
        Self {
            get: ref_getter(|owner| Some(owner)),
            get_mut: ref_getter_mut(|owner| Some(owner)),
        }
    }

    /// `self` followed by `next`
    pub fn then(&self, next: &Upcast) -> Upcast {
        let (first, second) = (self.get.clone(), next.get.clone());
        let (first_mut, second_mut) = (self.get_mut.clone(), next.get_mut.clone());
        Upcast {
            get: ref_getter(move |owner| first(owner).and_then(|mid| second(mid))),
            get_mut: ref_getter_mut(move |owner| first_mut(owner).and_then(|mid| second_mut(mid))),
        }
    }

    pub fn apply<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.get)(owner)
    }

    pub fn apply_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.get_mut)(owner)
    }
}

/// Builder handed to [`Mappable::describe`]
pub struct TypeDescriptor<S> {
    info: TypeInfo,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Mappable> TypeDescriptor<S> {
    fn new() -> Self {
        Self {
            info: TypeInfo {
                id: TypeId::of::<S>(),
                name: short_type_name::<S>(),
                members: Vec::new(),
                parents: Vec::new(),
                constructor: None,
            },
            _marker: PhantomData,
        }
    }

    /// Override the name used in diagnostics
    pub fn name(&mut self, name: &'static str) -> &mut Self {
        self.info.name = name;
        self
    }

    /// Zero-argument constructor used when records are read
    pub fn constructor<F>(&mut self, make: F) -> &mut Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.info.constructor = Some(Arc::new(move || Box::new(make()) as Box<dyn Any>));
        self
    }

    pub fn default_constructor(&mut self) -> &mut Self
    where
        S: Default,
    {
        self.constructor(S::default)
    }

    /// Scalar member converted to and from a single column
    pub fn field<T, G, W>(&mut self, name: &'static str, get: G, set: W) -> &mut Self
    where
        T: FieldValue,
        G: Fn(&S) -> &T + Send + Sync + 'static,
        W: Fn(&mut S, T) + Send + Sync + 'static,
    {
        let accessor = FieldAccessor {
            value_type: TypeId::of::<T>(),
            inner_type: T::inner_type_id(),
            type_name: std::any::type_name::<T>(),
            kind: T::kind(),
            get: Arc::new(move |owner: &dyn Any| {
                owner.downcast_ref::<S>().map(|s| get(s).to_value())
            }),
            set: Arc::new(move |owner: &mut dyn Any, value: Value| -> Result<(), String> {
                let target = owner
                    .downcast_mut::<S>()
                    .ok_or_else(|| format!("owner is not {}", std::any::type_name::<S>()))?;
                set(target, T::from_value(value)?);
                Ok(())
            }),
        };
        self.push(name, MemberShape::Field(accessor))
    }

    /// Nullable composite member, typically `Option<C>` or `Option<Box<C>>`
    pub fn reference<C, G, M, W>(
        &mut self,
        name: &'static str,
        get: G,
        get_mut: M,
        set: W,
    ) -> &mut Self
    where
        C: Mappable,
        G: Fn(&S) -> Option<&C> + Send + Sync + 'static,
        M: Fn(&mut S) -> Option<&mut C> + Send + Sync + 'static,
        W: Fn(&mut S, C) + Send + Sync + 'static,
    {
        let accessor = ReferenceAccessor {
            target: TypeId::of::<C>(),
            type_name: short_type_name::<C>(),
            nullable: true,
            child: type_info::<C>,
            get: ref_getter(move |owner| {
                owner
                    .downcast_ref::<S>()
                    .and_then(|s| get(s))
                    .map(|c| c as &dyn Any)
            }),
            get_mut: ref_getter_mut(move |owner| {
                owner
                    .downcast_mut::<S>()
                    .and_then(|s| get_mut(s))
                    .map(|c| c as &mut dyn Any)
            }),
            install: Arc::new(
                move |owner: &mut dyn Any, child: Box<dyn Any>| -> Result<(), String> {
                    let target = owner
                        .downcast_mut::<S>()
                        .ok_or_else(|| format!("owner is not {}", std::any::type_name::<S>()))?;
                    let child = child
                        .downcast::<C>()
                        .map_err(|_| format!("child is not {}", std::any::type_name::<C>()))?;
                    set(target, *child);
                    Ok(())
                },
            ),
        };
        self.push(name, MemberShape::Reference(accessor))
    }

    /// Composite member that is always present
    pub fn nested<C, G, M>(&mut self, name: &'static str, get: G, get_mut: M) -> &mut Self
    where
        C: Mappable,
        G: Fn(&S) -> &C + Send + Sync + 'static,
        M: Fn(&mut S) -> &mut C + Send + Sync + 'static,
    {
        let get_mut = Arc::new(get_mut);
        let install_get_mut = get_mut.clone();
        let accessor = ReferenceAccessor {
            target: TypeId::of::<C>(),
            type_name: short_type_name::<C>(),
            nullable: false,
            child: type_info::<C>,
            get: ref_getter(move |owner| {
                owner.downcast_ref::<S>().map(|s| get(s) as &dyn Any)
            }),
            get_mut: ref_getter_mut(move |owner| {
                owner
                    .downcast_mut::<S>()
                    .map(|s| get_mut(s) as &mut dyn Any)
            }),
            install: Arc::new(
                move |owner: &mut dyn Any, child: Box<dyn Any>| -> Result<(), String> {
                    let target = owner
                        .downcast_mut::<S>()
                        .ok_or_else(|| format!("owner is not {}", std::any::type_name::<S>()))?;
                    let child = child
                        .downcast::<C>()
                        .map_err(|_| format!("child is not {}", std::any::type_name::<C>()))?;
                    *install_get_mut(target) = *child;
                    Ok(())
                },
            ),
        };
        self.push(name, MemberShape::Reference(accessor))
    }

    /// Declare `P` as a parent type. Members of `P` are inherited and maps
    /// registered for `P` apply to `S`.
    pub fn extends<P, G, M>(&mut self, get: G, get_mut: M) -> &mut Self
    where
        P: Mappable,
        G: Fn(&S) -> &P + Send + Sync + 'static,
        M: Fn(&mut S) -> &mut P + Send + Sync + 'static,
    {
        self.info.parents.push(ParentInfo {
            id: TypeId::of::<P>(),
            name: short_type_name::<P>(),
            info: type_info::<P>,
            upcast: Upcast {
                get: ref_getter(move |owner| {
                    owner.downcast_ref::<S>().map(|s| get(s) as &dyn Any)
                }),
                get_mut: ref_getter_mut(move |owner| {
                    owner
                        .downcast_mut::<S>()
                        .map(|s| get_mut(s) as &mut dyn Any)
                }),
            },
        });
        self
    }

    fn push(&mut self, name: &'static str, shape: MemberShape) -> &mut Self {
        self.info.members.retain(|m| m.name != name);
        self.info.members.push(MemberInfo { name, shape });
        self
    }
}

/// Last path segment of the type name, generics kept
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base_end = full.find('<').unwrap_or(full.len());
    match full[..base_end].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}
