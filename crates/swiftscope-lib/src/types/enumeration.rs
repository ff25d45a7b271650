use std::rc::Rc;

use once_cell::unsync::OnceCell;
use swiftscope_abi::{CaseKind, EnumDescriptor, Precondition, TypeLayout};
use swiftscope_core::Address;

use crate::Result;
use crate::target::Target;
use crate::types::{TypeInfo, ValueTypeCore};
use crate::value::{EnumValue, RuntimeInstance};

/// One enum case. The tag is the case's index in the field records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumCase {
    pub name: String,
    pub tag: u32,
    pub kind: CaseKind,
    /// Payload type name, when the symbolic reference resolver knows it.
    pub payload_type_name: Option<String>,
}

impl EnumCase {
    pub fn has_payload(&self) -> bool {
        self.kind == CaseKind::Payload
    }
}

#[derive(Debug)]
pub struct Enum {
    core: Rc<ValueTypeCore>,
    descriptor: EnumDescriptor,
    cases: Vec<EnumCase>,
    /// Per case; only no-payload cases ever fill theirs.
    case_values: Vec<OnceCell<EnumValue>>,
}

impl Enum {
    pub(crate) fn read(target: &Target, descriptor: EnumDescriptor) -> Result<Self> {
        let core = ValueTypeCore::read(target, *descriptor)?;
        let memory = target.memory();

        let cases = match descriptor.fields(memory, target.limits())? {
            Some(fields) if fields.num_fields() > 0 => {
                let kinds =
                    descriptor.classify_cases(memory, &fields, target.config().verify_enum_cases)?;
                fields
                    .records()
                    .iter()
                    .zip(kinds)
                    .enumerate()
                    .map(|(tag, (record, kind))| EnumCase {
                        name: record.name.clone(),
                        tag: tag as u32,
                        kind,
                        payload_type_name: record
                            .mangled_type_name
                            .and_then(|m| target.resolve_type_name(m)),
                    })
                    .collect()
            }
            _ => Vec::new(),
        };
        tracing::trace!(name = core.info.name(), cases = cases.len(), "read enum");

        Ok(Self {
            core: Rc::new(core),
            descriptor,
            case_values: cases.iter().map(|_| OnceCell::new()).collect(),
            cases,
        })
    }

    pub fn info(&self) -> &TypeInfo {
        &self.core.info
    }

    pub fn descriptor(&self) -> &EnumDescriptor {
        &self.descriptor
    }

    /// `None` for generic enums.
    pub fn type_layout(&self) -> Option<TypeLayout> {
        self.core.layout()
    }

    pub fn cases(&self) -> &[EnumCase] {
        &self.cases
    }

    pub fn case(&self, name: &str) -> Option<&EnumCase> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn case_at(&self, index: usize) -> Result<&EnumCase> {
        self.cases.get(index).ok_or_else(|| {
            Precondition::CaseIndexOutOfRange {
                index,
                count: self.cases.len(),
            }
            .into()
        })
    }

    /// Whether the case at `index` carries a payload.
    pub fn is_payload_case(&self, index: usize) -> Result<bool> {
        Ok(self.case_at(index)?.has_payload())
    }

    /// The value of a no-payload case.
    ///
    /// Materialized on first access; later calls return the same value.
    pub fn case_value(&self, name: &str) -> Result<&EnumValue> {
        let case = self.require_case(name)?;
        if case.has_payload() {
            return Err(Precondition::PayloadRequired {
                case: case.name.clone(),
            }
            .into());
        }
        let tag = case.tag;
        Ok(self.case_values[tag as usize]
            .get_or_init(|| EnumValue::with_tag(Rc::clone(&self.core), tag, None)))
    }

    /// Construct the case `name`.
    ///
    /// Payload cases require `payload`; no-payload cases reject it. The
    /// payload's type is not checked against the case.
    pub fn make_case(&self, name: &str, payload: Option<RuntimeInstance>) -> Result<EnumValue> {
        let case = self.require_case(name)?;
        match (case.kind, payload) {
            (CaseKind::Payload, None) => Err(Precondition::PayloadRequired {
                case: case.name.clone(),
            }
            .into()),
            (CaseKind::Empty, Some(_)) => Err(Precondition::UnexpectedPayload {
                case: case.name.clone(),
            }
            .into()),
            (_, payload) => Ok(EnumValue::with_tag(Rc::clone(&self.core), case.tag, payload)),
        }
    }

    /// Enums have no valid all-zero state.
    pub fn make_empty_value(&self) -> Result<EnumValue> {
        Err(Precondition::EmptyEnumValue {
            type_name: self.core.info.qualified_name(),
        }
        .into())
    }

    /// View the value at `address`; its tag is read on demand.
    pub fn make_value_from_raw(&self, address: Address) -> Result<EnumValue> {
        Ok(EnumValue::from_instance(Rc::clone(&self.core), self.core.view(address)?))
    }

    pub fn copy_raw(&self, dest: Address, src: Address) -> Result<()> {
        self.core.copy_raw(dest, src)
    }

    /// A new owned value initialized as a copy of the one at `src`.
    pub fn initialize_with_copy_raw(&self, src: Address) -> Result<EnumValue> {
        let instance = self.core.allocate()?;
        self.core.copy_raw(instance.address(), src)?;
        Ok(EnumValue::from_instance(Rc::clone(&self.core), instance))
    }

    fn require_case(&self, name: &str) -> Result<&EnumCase> {
        self.case(name).ok_or_else(|| {
            Precondition::UnknownCase {
                type_name: self.core.info.qualified_name(),
                case: name.to_owned(),
            }
            .into()
        })
    }
}
