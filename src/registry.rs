//! Type and Width Registries
//!
//! Static tables of the scalar types the generated library supports and of
//! the raw storage widths the legacy backend uses to back them.
//!
//! ## Tables
//! - `SCALAR_TYPES`: the 14 public scalar types, in emission order
//! - `INTERNAL_WIDTHS`: the 4 fixed byte widths (1, 2, 4, 8)
//!
//! Both tables are exhaustive. Supporting a new platform type means adding a
//! row here, never handling a lookup failure at generation time.

use std::fmt;

/// The closed set of public scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    Char,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    IntPtr,
    UIntPtr,
    Size,
    PtrDiff,
    UIntMax,
}

/// Naming and size metadata for one public scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub scalar: ScalarType,
    /// C spelling, may contain spaces ("unsigned long long").
    pub name: &'static str,
    /// Suffix of the facility's atomic typedef (`atomic_ullong`).
    pub std_name: &'static str,
}

impl TypeDescriptor {
    /// Identifier-safe form of the display name.
    pub fn designator(&self) -> String {
        self.name.replace(' ', "_")
    }

    pub fn constant_designator(&self) -> String {
        self.designator().to_uppercase()
    }

    /// `EMBB_UNSIGNED_INT_TYPE_SIZE` for namespace `EMBB`.
    pub fn size_define(&self, macro_ns: &str) -> String {
        format!("{}_{}_TYPE_SIZE", macro_ns, self.constant_designator())
    }

    /// Per-type feature flag guarding every declaration for this type.
    pub fn is_atomic_define(&self, macro_ns: &str) -> String {
        format!("{}_{}_TYPE_IS_ATOMIC", macro_ns, self.constant_designator())
    }

    /// Preprocessor expression naming the plain storage type of matching width.
    pub fn basic_type(&self, macro_ns: &str) -> String {
        format!(
            "{ns}_XCAT2({ns}_BASE_BASIC_TYPE_SIZE_, {})",
            self.size_define(macro_ns),
            ns = macro_ns
        )
    }

    /// Preprocessor expression naming the atomic storage type of matching width.
    pub fn basic_atomic_type(&self, macro_ns: &str) -> String {
        format!(
            "{ns}_XCAT2({ns}_BASE_BASIC_TYPE_ATOMIC_, {})",
            self.size_define(macro_ns),
            ns = macro_ns
        )
    }

    /// Name of the opaque cell type, e.g. `embb_atomic_unsigned_int`.
    pub fn cell_type(&self, ns: &str) -> String {
        format!("{}_atomic_{}", ns, self.designator())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A raw storage width used by the legacy backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalWidth {
    pub bytes: usize,
    /// Fixed-width unsigned type backing the storage slot.
    pub std_name: &'static str,
}

impl InternalWidth {
    /// Finds the width whose byte count equals `bytes`.
    pub fn for_size(bytes: usize) -> Option<&'static InternalWidth> {
        INTERNAL_WIDTHS.iter().find(|w| w.bytes == bytes)
    }

    pub fn designator(&self) -> String {
        self.bytes.to_string()
    }

    /// `EMBB_BASE_BASIC_TYPE_SIZE_4`
    pub fn storage_typedef(&self, macro_ns: &str) -> String {
        format!("{}_BASE_BASIC_TYPE_SIZE_{}", macro_ns, self.bytes)
    }

    /// `EMBB_BASE_BASIC_TYPE_ATOMIC_4`
    pub fn atomic_typedef(&self, macro_ns: &str) -> String {
        format!("{}_BASE_BASIC_TYPE_ATOMIC_{}", macro_ns, self.bytes)
    }
}

pub static SCALAR_TYPES: [TypeDescriptor; 14] = [
    TypeDescriptor { scalar: ScalarType::Char, name: "char", std_name: "char" },
    TypeDescriptor { scalar: ScalarType::Short, name: "short", std_name: "short" },
    TypeDescriptor { scalar: ScalarType::UnsignedShort, name: "unsigned short", std_name: "ushort" },
    TypeDescriptor { scalar: ScalarType::Int, name: "int", std_name: "int" },
    TypeDescriptor { scalar: ScalarType::UnsignedInt, name: "unsigned int", std_name: "uint" },
    TypeDescriptor { scalar: ScalarType::Long, name: "long", std_name: "long" },
    TypeDescriptor { scalar: ScalarType::UnsignedLong, name: "unsigned long", std_name: "ulong" },
    TypeDescriptor { scalar: ScalarType::LongLong, name: "long long", std_name: "llong" },
    TypeDescriptor { scalar: ScalarType::UnsignedLongLong, name: "unsigned long long", std_name: "ullong" },
    TypeDescriptor { scalar: ScalarType::IntPtr, name: "intptr_t", std_name: "intptr_t" },
    TypeDescriptor { scalar: ScalarType::UIntPtr, name: "uintptr_t", std_name: "uintptr_t" },
    TypeDescriptor { scalar: ScalarType::Size, name: "size_t", std_name: "size_t" },
    TypeDescriptor { scalar: ScalarType::PtrDiff, name: "ptrdiff_t", std_name: "ptrdiff_t" },
    TypeDescriptor { scalar: ScalarType::UIntMax, name: "uintmax_t", std_name: "uintmax_t" },
];

pub static INTERNAL_WIDTHS: [InternalWidth; 4] = [
    InternalWidth { bytes: 1, std_name: "uint_least8_t" },
    InternalWidth { bytes: 2, std_name: "uint_least16_t" },
    InternalWidth { bytes: 4, std_name: "uint_least32_t" },
    InternalWidth { bytes: 8, std_name: "uint_least64_t" },
];

/// Returns the descriptor of `scalar`. Total over the closed type set.
pub fn describe_type(scalar: ScalarType) -> &'static TypeDescriptor {
    // The table is declared in enum order.
    &SCALAR_TYPES[scalar as usize]
}

/// Resolves a C display name such as `"unsigned long"`.
pub fn lookup_type(name: &str) -> Option<&'static TypeDescriptor> {
    SCALAR_TYPES.iter().find(|t| t.name == name)
}

/// Target data model: decides `sizeof` for each scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataModel {
    /// 64-bit Unix: long and pointers are 8 bytes.
    #[default]
    Lp64,
    /// 64-bit Windows: long stays 4 bytes, pointers are 8.
    Llp64,
    /// 32-bit targets.
    Ilp32,
}

impl DataModel {
    pub fn size_of(self, scalar: ScalarType) -> usize {
        use ScalarType::*;
        let pointer = match self {
            DataModel::Lp64 | DataModel::Llp64 => 8,
            DataModel::Ilp32 => 4,
        };
        match scalar {
            Char => 1,
            Short | UnsignedShort => 2,
            Int | UnsignedInt => 4,
            Long | UnsignedLong => match self {
                DataModel::Lp64 => 8,
                DataModel::Llp64 | DataModel::Ilp32 => 4,
            },
            LongLong | UnsignedLongLong | UIntMax => 8,
            IntPtr | UIntPtr | Size | PtrDiff => pointer,
        }
    }
}

/// Maps a type to the storage width matching its `sizeof` on `model`.
pub fn width_for(ty: &TypeDescriptor, model: DataModel) -> &'static InternalWidth {
    let bytes = model.size_of(ty.scalar);
    match InternalWidth::for_size(bytes) {
        Some(width) => width,
        // size_of only yields 1, 2, 4 or 8
        None => unreachable!("no internal width of {} bytes", bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_in_enum_order() {
        for (index, ty) in SCALAR_TYPES.iter().enumerate() {
            assert_eq!(ty.scalar as usize, index, "{} is out of order", ty.name);
        }
    }

    #[test]
    fn test_designators() {
        let ty = describe_type(ScalarType::UnsignedLongLong);
        assert_eq!(ty.designator(), "unsigned_long_long");
        assert_eq!(ty.constant_designator(), "UNSIGNED_LONG_LONG");
        assert_eq!(ty.size_define("EMBB"), "EMBB_UNSIGNED_LONG_LONG_TYPE_SIZE");
        assert_eq!(ty.is_atomic_define("EMBB"), "EMBB_UNSIGNED_LONG_LONG_TYPE_IS_ATOMIC");
        assert_eq!(ty.cell_type("embb"), "embb_atomic_unsigned_long_long");
    }

    #[test]
    fn test_basic_type_expression() {
        let ty = describe_type(ScalarType::Char);
        assert_eq!(
            ty.basic_type("EMBB"),
            "EMBB_XCAT2(EMBB_BASE_BASIC_TYPE_SIZE_, EMBB_CHAR_TYPE_SIZE)"
        );
    }

    #[test]
    fn test_long_depends_on_data_model() {
        let long = describe_type(ScalarType::Long);
        assert_eq!(width_for(long, DataModel::Lp64).bytes, 8);
        assert_eq!(width_for(long, DataModel::Llp64).bytes, 4);
        assert_eq!(width_for(long, DataModel::Ilp32).bytes, 4);
    }

    #[test]
    fn test_unknown_width() {
        assert!(InternalWidth::for_size(3).is_none());
        assert_eq!(InternalWidth::for_size(2).map(|w| w.std_name), Some("uint_least16_t"));
    }
}
