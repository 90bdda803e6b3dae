//! Operation Catalog
//!
//! Plain-data descriptions of every atomic operation and of its three
//! renderings. One rendering function per backend consumes these records
//! (see `emit::generators`); there is no per-operation code.
//!
//! Two tables:
//! - `OPERATIONS`: the public per-type API (`embb_atomic_<stem>_<designator>`)
//! - `INTERNAL_OPERATIONS`: the width-indexed helpers the legacy path calls
//!   (`embb_internal__atomic_<stem>_<width>`)

use std::fmt;

/// Identifies an operation independently of its rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Init,
    AndAssign,
    CompareAndSwap,
    FetchAndAdd,
    Load,
    OrAssign,
    Store,
    Swap,
    XorAssign,
    Destroy,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Init => "init",
            OpKind::AndAssign => "and_assign",
            OpKind::CompareAndSwap => "compare_and_swap",
            OpKind::FetchAndAdd => "fetch_and_add",
            OpKind::Load => "load",
            OpKind::OrAssign => "or_assign",
            OpKind::Store => "store",
            OpKind::Swap => "swap",
            OpKind::XorAssign => "xor_assign",
            OpKind::Destroy => "destroy",
        };
        f.write_str(name)
    }
}

/// The three mutually exclusive implementation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    /// C++11 `std::atomic` members.
    Native,
    /// C11 `<stdatomic.h>` free functions.
    Standard,
    /// Per-cell mutex around plain fixed-width storage.
    Legacy,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Native, Backend::Standard, Backend::Legacy];

    /// Preprocessor condition selecting this backend, `None` for the `#else` arm.
    pub fn condition(self, macro_ns: &str) -> Option<String> {
        match self {
            Backend::Native => Some(format!("defined {}_PLATFORM_ARCH_CXX11", macro_ns)),
            Backend::Standard => Some(format!("defined {}_PLATFORM_ARCH_C11", macro_ns)),
            Backend::Legacy => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Native => "native",
            Backend::Standard => "standard",
            Backend::Legacy => "legacy",
        };
        f.write_str(name)
    }
}

/// Declared return type of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Void,
    Fixed(&'static str),
    /// Same as the operand type.
    Operand,
}

impl ReturnShape {
    /// Return type as template text.
    pub fn template(self) -> &'static str {
        match self {
            ReturnShape::Void => "void",
            ReturnShape::Fixed(ty) => ty,
            ReturnShape::Operand => "{type}",
        }
    }

    pub fn has_value(self) -> bool {
        !matches!(self, ReturnShape::Void)
    }
}

/// Parameters following the cell pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Value,
    Expected,
    Desired,
}

impl Parameter {
    pub fn template(self) -> &'static str {
        match self {
            Parameter::Value => "{type} value",
            Parameter::Expected => "{type}* expected",
            Parameter::Desired => "{type} desired",
        }
    }
}

/// One public operation and its per-backend renderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub kind: OpKind,
    pub stem: &'static str,
    pub returns: ReturnShape,
    pub params: &'static [Parameter],
    /// Takes a `const` cell where the variant allows it.
    pub read_only: bool,
    pub native: &'static str,
    pub standard: &'static str,
    pub legacy: &'static str,
    /// Lines emitted before the backend branch.
    pub pre: &'static str,
    /// Lines emitted after the backend branch.
    pub post: &'static str,
}

impl OperationDescriptor {
    pub fn body(&self, backend: Backend) -> &'static str {
        match backend {
            Backend::Native => self.native,
            Backend::Standard => self.standard,
            Backend::Legacy => self.legacy,
        }
    }

    /// Signature template: `<ret> <ns>_atomic_<stem>_<designator>(<cell>* variable, ...)`.
    pub fn signature(&self, const_cell: bool) -> String {
        signature(
            self.returns,
            &format!("{{ns}}_atomic_{}_{{designator}}", self.stem),
            const_cell && self.read_only,
            self.params,
        )
    }
}

/// One width-indexed internal helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalOperation {
    pub kind: OpKind,
    pub stem: &'static str,
    pub returns: ReturnShape,
    pub params: &'static [Parameter],
    pub read_only: bool,
    pub native: &'static str,
    pub standard: &'static str,
    /// Plain C on the storage slot; the caller holds the cell lock.
    pub legacy: &'static str,
}

impl InternalOperation {
    pub fn body(&self, backend: Backend) -> &'static str {
        match backend {
            Backend::Native => self.native,
            Backend::Standard => self.standard,
            Backend::Legacy => self.legacy,
        }
    }

    pub fn signature(&self, const_cell: bool) -> String {
        signature(
            self.returns,
            &format!("{{ns}}_internal__atomic_{}_{{designator}}", self.stem),
            const_cell && self.read_only,
            self.params,
        )
    }
}

fn signature(returns: ReturnShape, name: &str, const_cell: bool, params: &[Parameter]) -> String {
    let mut out = format!("{} {}(\n  ", returns.template(), name);
    if const_cell {
        out.push_str("const ");
    }
    out.push_str("{cell}* variable");
    for param in params {
        out.push_str(",\n  ");
        out.push_str(param.template());
    }
    out.push_str("\n  )");
    out
}

const CHECK_AND_LOCK: &str =
    "  {NS}_ATOMIC_INIT_CHECK(variable);\n  {NS}_ATOMIC_MUTEX_LOCK(variable->internal_mutex);\n";
const UNLOCK: &str = "  {NS}_ATOMIC_MUTEX_UNLOCK(variable->internal_mutex);\n";

/// Legacy tail for operand-returning operations: copies the storage-typed
/// result back into the operand type.
pub const LEGACY_RETURN_COPY: &str =
    "{type} return_val;\n  memcpy(&return_val, &return_val_basic, sizeof(return_val))";

pub static OPERATIONS: [OperationDescriptor; 10] = [
    OperationDescriptor {
        kind: OpKind::Init,
        stem: "init",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "{call}store({object}{sep}value)",
        standard: "{call}init({object}{sep}value)",
        legacy: "{stage:value}{call}store{size}({object}, value_basic)",
        pre: "  {NS}_ATOMIC_MUTEX_INIT(variable->internal_mutex);\n  {NS}_ATOMIC_INIT_MARKER(variable);\n",
        post: "",
    },
    OperationDescriptor {
        kind: OpKind::AndAssign,
        stem: "and_assign",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "(void){call}fetch_and({object}{sep}value)",
        standard: "(void){call}fetch_and({object}{sep}value)",
        legacy: "{stage:value}{call}and_assign{size}({object}, value_basic)",
        pre: CHECK_AND_LOCK,
        post: UNLOCK,
    },
    OperationDescriptor {
        kind: OpKind::CompareAndSwap,
        stem: "compare_and_swap",
        returns: ReturnShape::Fixed("int"),
        params: &[Parameter::Expected, Parameter::Desired],
        read_only: false,
        native: "{ret}{call}compare_exchange_strong({object}{sep}{deref}expected, desired)",
        standard: "{ret}{call}compare_exchange_strong({object}{sep}{deref}expected, desired)",
        legacy: "{stage:desired}{stage_deref:expected}{ret}{call}compare_and_swap{size}({object}, &expected_basic, desired_basic);\n  memcpy(expected, &expected_basic, sizeof(*expected))",
        pre: CHECK_AND_LOCK,
        post: UNLOCK,
    },
    OperationDescriptor {
        kind: OpKind::FetchAndAdd,
        stem: "fetch_and_add",
        returns: ReturnShape::Operand,
        params: &[Parameter::Value],
        read_only: false,
        native: "{ret}{call}fetch_add({object}{sep}value)",
        standard: "{ret}{call}fetch_add({object}{sep}value)",
        legacy: "{stage:value}{ret}{call}fetch_and_add{size}({object}, value_basic)",
        pre: CHECK_AND_LOCK,
        post: UNLOCK,
    },
    OperationDescriptor {
        kind: OpKind::Load,
        stem: "load",
        returns: ReturnShape::Operand,
        params: &[],
        read_only: true,
        native: "{ret}{call}load({object})",
        standard: "{ret}{call}load({object})",
        legacy: "{ret}{call}load{size}({object})",
        pre: CHECK_AND_LOCK,
        post: UNLOCK,
    },
    OperationDescriptor {
        kind: OpKind::OrAssign,
        stem: "or_assign",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "(void){call}fetch_or({object}{sep}value)",
        standard: "(void){call}fetch_or({object}{sep}value)",
        legacy: "{stage:value}{call}or_assign{size}({object}, value_basic)",
        pre: CHECK_AND_LOCK,
        post: UNLOCK,
    },
    OperationDescriptor {
        kind: OpKind::Store,
        stem: "store",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "{call}store({object}{sep}value)",
        standard: "{call}store({object}{sep}value)",
        legacy: "{stage:value}{call}store{size}({object}, value_basic)",
        pre: CHECK_AND_LOCK,
        post: UNLOCK,
    },
    OperationDescriptor {
        kind: OpKind::Swap,
        stem: "swap",
        returns: ReturnShape::Operand,
        params: &[Parameter::Value],
        read_only: false,
        native: "{ret}{call}exchange({object}{sep}value)",
        standard: "{ret}{call}exchange({object}{sep}value)",
        legacy: "{stage:value}{ret}{call}swap{size}({object}, value_basic)",
        pre: CHECK_AND_LOCK,
        post: UNLOCK,
    },
    OperationDescriptor {
        kind: OpKind::XorAssign,
        stem: "xor_assign",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "(void){call}fetch_xor({object}{sep}value)",
        standard: "(void){call}fetch_xor({object}{sep}value)",
        legacy: "{stage:value}{call}xor_assign{size}({object}, value_basic)",
        pre: CHECK_AND_LOCK,
        post: UNLOCK,
    },
    OperationDescriptor {
        kind: OpKind::Destroy,
        stem: "destroy",
        returns: ReturnShape::Void,
        params: &[],
        read_only: false,
        native: "(void)variable",
        standard: "(void)variable",
        legacy: "(void)variable",
        pre: "  {NS}_ATOMIC_INIT_CHECK(variable);\n",
        post: "  {NS}_ATOMIC_MUTEX_DESTROY(variable->internal_mutex);\n  {NS}_ATOMIC_DESTROY_MARKER(variable);\n",
    },
];

pub static INTERNAL_OPERATIONS: [InternalOperation; 8] = [
    InternalOperation {
        kind: OpKind::AndAssign,
        stem: "and_assign",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "(void){call}fetch_and({object}{sep}value)",
        standard: "(void){call}fetch_and({object}{sep}value)",
        legacy: "*variable &= value",
    },
    InternalOperation {
        kind: OpKind::CompareAndSwap,
        stem: "compare_and_swap",
        returns: ReturnShape::Fixed("int"),
        params: &[Parameter::Expected, Parameter::Desired],
        read_only: false,
        native: "{ret}{call}compare_exchange_strong({object}{sep}{deref}expected, desired)",
        standard: "{ret}{call}compare_exchange_strong({object}{sep}{deref}expected, desired)",
        legacy: "if (*variable == *expected) {{\n    *variable = desired;\n    return 1;\n  }}\n  *expected = *variable;\n  return 0",
    },
    InternalOperation {
        kind: OpKind::FetchAndAdd,
        stem: "fetch_and_add",
        returns: ReturnShape::Operand,
        params: &[Parameter::Value],
        read_only: false,
        native: "{ret}{call}fetch_add({object}{sep}value)",
        standard: "{ret}{call}fetch_add({object}{sep}value)",
        legacy: "{type} old_value = *variable;\n  *variable = ({type})(old_value + value);\n  return old_value",
    },
    InternalOperation {
        kind: OpKind::Load,
        stem: "load",
        returns: ReturnShape::Operand,
        params: &[],
        read_only: true,
        native: "{ret}{call}load({object})",
        standard: "{ret}{call}load({object})",
        legacy: "return *variable",
    },
    InternalOperation {
        kind: OpKind::OrAssign,
        stem: "or_assign",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "(void){call}fetch_or({object}{sep}value)",
        standard: "(void){call}fetch_or({object}{sep}value)",
        legacy: "*variable |= value",
    },
    InternalOperation {
        kind: OpKind::Store,
        stem: "store",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "{call}store({object}{sep}value)",
        standard: "{call}store({object}{sep}value)",
        legacy: "*variable = value",
    },
    InternalOperation {
        kind: OpKind::Swap,
        stem: "swap",
        returns: ReturnShape::Operand,
        params: &[Parameter::Value],
        read_only: false,
        native: "{ret}{call}exchange({object}{sep}value)",
        standard: "{ret}{call}exchange({object}{sep}value)",
        legacy: "{type} old_value = *variable;\n  *variable = value;\n  return old_value",
    },
    InternalOperation {
        kind: OpKind::XorAssign,
        stem: "xor_assign",
        returns: ReturnShape::Void,
        params: &[Parameter::Value],
        read_only: false,
        native: "(void){call}fetch_xor({object}{sep}value)",
        standard: "(void){call}fetch_xor({object}{sep}value)",
        legacy: "*variable ^= value",
    },
];

pub fn describe_operation(kind: OpKind) -> &'static OperationDescriptor {
    // OPERATIONS is declared in OpKind order.
    &OPERATIONS[kind as usize]
}

pub fn internal_operation(kind: OpKind) -> Option<&'static InternalOperation> {
    INTERNAL_OPERATIONS.iter().find(|op| op.kind == kind)
}
