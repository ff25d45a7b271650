use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use serde::Serialize;
use serde_json::{Value, json};
use swiftscope_abi::{ClassDescriptor, MethodKind, Precondition};
use swiftscope_core::{Address, NativeCall};

use crate::registry::TypeRegistry;
use crate::signature::MethodSignature;
use crate::target::Target;
use crate::types::{Type, TypeInfo};
use crate::value::{ObjectInstance, RuntimeInstance};
use crate::{Error, Result};

/// A vtable entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodDetails {
    pub address: Address,
    /// Symbol at `address`, if the resolver has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: MethodKind,
}

#[derive(Debug)]
pub struct Class {
    info: TypeInfo,
    descriptor: ClassDescriptor,
    methods: OnceCell<Vec<MethodDetails>>,
    initializers: OnceCell<IndexMap<String, Initializer>>,
}

impl Class {
    pub(crate) fn read(target: &Target, descriptor: ClassDescriptor) -> Result<Self> {
        let info = TypeInfo::read(target, *descriptor)?;
        Ok(Self {
            info,
            descriptor,
            methods: OnceCell::new(),
            initializers: OnceCell::new(),
        })
    }

    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn descriptor(&self) -> &ClassDescriptor {
        &self.descriptor
    }

    /// Vtable entries with an implementation, in slot order.
    ///
    /// Empty without a vtable and for generic classes.
    pub fn methods(&self) -> Result<&[MethodDetails]> {
        self.methods
            .get_or_try_init(|| self.read_methods())
            .map(Vec::as_slice)
    }

    /// Initializers whose symbol parses as a signature, keyed by selector
    /// (`init(first:second:)`).
    pub fn initializers(&self) -> Result<&IndexMap<String, Initializer>> {
        self.initializers.get_or_try_init(|| self.bind_initializers())
    }

    pub fn initializer(&self, selector: &str) -> Result<Option<&Initializer>> {
        Ok(self.initializers()?.get(selector))
    }

    pub fn to_json(&self) -> Result<Value> {
        let mut object = self.info.snapshot();
        object.insert("methods".into(), json!(self.methods()?));
        Ok(Value::Object(object))
    }

    fn read_methods(&self) -> Result<Vec<MethodDetails>> {
        let target = self.info.target();
        let descriptors = self.descriptor.methods(target.memory(), target.limits())?;
        let resolve = target.config().resolve_method_names;
        descriptors
            .iter()
            .map(|m| {
                Ok(MethodDetails {
                    address: m.implementation,
                    name: resolve.then(|| target.symbol_name(m.implementation)).flatten(),
                    kind: m.kind()?,
                })
            })
            .collect()
    }

    fn bind_initializers(&self) -> Result<IndexMap<String, Initializer>> {
        let mut initializers = IndexMap::new();
        let Some(metadata) = self.info.metadata() else {
            return Ok(initializers);
        };
        if !self.info.target().config().bind_initializers {
            return Ok(initializers);
        }
        for method in self.methods()? {
            if method.kind != MethodKind::Init {
                continue;
            }
            let Some(signature) = method.name.as_deref().and_then(MethodSignature::parse) else {
                continue;
            };
            let selector = signature.selector();
            tracing::debug!(class = self.info.name(), %selector, "bound initializer");
            initializers.insert(
                selector.clone(),
                Initializer {
                    selector,
                    signature,
                    address: method.address,
                    metadata,
                    class_name: self.info.qualified_name(),
                    target: self.info.target().clone(),
                },
            );
        }
        Ok(initializers)
    }
}

/// An argument to a native call.
#[derive(Clone, Copy, Debug)]
pub enum Argument<'a> {
    /// A raw pointer-sized word.
    Word(u64),
    /// A live value, passed by address.
    Value(&'a RuntimeInstance),
}

/// A callable initializer bound to its class.
#[derive(Debug)]
pub struct Initializer {
    selector: String,
    signature: MethodSignature,
    address: Address,
    metadata: Address,
    class_name: String,
    target: Target,
}

impl Initializer {
    /// Selector, e.g. `init(first:second:)`.
    pub fn name(&self) -> &str {
        &self.selector
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Call the initializer with the class metadata as context.
    ///
    /// Argument types are looked up in `registry` by name. Values must be
    /// of exactly that type and are passed the way the calling convention
    /// passes them: objects by pointer, value types of at most one word in
    /// a register. Larger values are rejected. Raw words are accepted for
    /// classes and for value types of at most one word.
    pub fn invoke(&self, registry: &dyn TypeRegistry, args: &[Argument<'_>]) -> Result<ObjectInstance> {
        let expected = self.signature.arg_type_names.len();
        if args.len() != expected {
            return Err(Precondition::ArityMismatch {
                name: self.selector.clone(),
                expected,
                actual: args.len(),
            }
            .into());
        }

        let mut words = Vec::with_capacity(args.len());
        for (index, (arg, type_name)) in args.iter().zip(&self.signature.arg_type_names).enumerate() {
            let ty = registry
                .type_by_name(type_name)
                .ok_or_else(|| Error::UnknownType(type_name.clone()))?;
            let mismatch = |actual: String| Precondition::ArgumentTypeMismatch {
                name: self.selector.clone(),
                index,
                expected: type_name.clone(),
                actual,
            };
            match arg {
                Argument::Word(word) => {
                    if !accepts_word(ty) {
                        return Err(mismatch("word".to_owned()).into());
                    }
                    words.push(*word);
                }
                Argument::Value(value) => {
                    let actual = value.type_name();
                    if actual != ty.qualified_name() {
                        return Err(mismatch(actual).into());
                    }
                    words.push(self.argument_word(ty, value, index)?);
                }
            }
        }

        let call = NativeCall::with_args(self.address, &words).context(self.metadata);
        let object = Address::new(self.target.call(call)?);
        Ok(ObjectInstance::new(object, self.metadata, self.class_name.clone()))
    }

    /// Objects go as their pointer, single-word values as their bytes.
    fn argument_word(&self, ty: &Type, value: &RuntimeInstance, index: usize) -> Result<u64> {
        let address = value.address()?;
        if let Type::Class(_) = ty {
            return Ok(address.get());
        }
        let size = ty
            .type_layout()
            .ok_or_else(|| Precondition::GenericLayout {
                type_name: ty.qualified_name(),
            })?
            .size;
        if size > 8 {
            return Err(Precondition::UnsupportedArgument {
                name: self.selector.clone(),
                index,
                size,
            }
            .into());
        }
        let mut buf = [0u8; 8];
        self.target.memory().read_bytes(address, &mut buf[..size as usize])?;
        Ok(u64::from_le_bytes(buf))
    }
}

fn accepts_word(ty: &Type) -> bool {
    match ty {
        Type::Class(_) => true,
        _ => ty.type_layout().is_some_and(|layout| layout.size <= 8),
    }
}
