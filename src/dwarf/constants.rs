//! DWARF version 1 constant definitions.
//!
//! Each family is a newtype over its encoded width (`DwTag(u16)`,
//! `DwAt(u16)`, ...) with an exported const per value, so they can be used
//! directly as match patterns.

#![allow(non_upper_case_globals)]
#![allow(missing_docs)]

use std::fmt;

// The `dw!` macro turns this:
//
//     dw!(DwFoo(u16) {
//         DW_FOO_bar = 0,
//         DW_FOO_baz = 1,
//     });
//
// into a `DwFoo(pub u16)` newtype, one `pub const` per name, a
// `static_string` lookup and a `Display` impl that falls back to the raw
// value for anything unnamed.
macro_rules! dw {
    ($(#[$meta:meta])* $struct_name:ident($struct_type:ty)
        { $($name:ident = $val:expr),+ $(,)? }
        $(, aliases { $($alias_name:ident = $alias_val:expr),+ $(,)? })?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $struct_name(pub $struct_type);

        $(
            pub const $name: $struct_name = $struct_name($val);
        )+
        $($(
            pub const $alias_name: $struct_name = $struct_name($alias_val);
        )+)*

        impl $struct_name {
            pub fn static_string(&self) -> Option<&'static str> {
                Some(match *self {
                    $(
                        $name => stringify!($name),
                    )+
                    _ => return None,
                })
            }
        }

        impl fmt::Display for $struct_name {
            fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
                if let Some(s) = self.static_string() {
                    f.pad(s)
                } else {
                    f.pad(&format!("Unknown {}: 0x{:x}", stringify!($struct_name), self.0))
                }
            }
        }
    };
}

dw!(
/// The tag of a `.debug` entry.
DwTag(u16) {
    DW_TAG_padding = 0x0000,
    DW_TAG_array_type = 0x0001,
    DW_TAG_class_type = 0x0002,
    DW_TAG_entry_point = 0x0003,
    DW_TAG_enumeration_type = 0x0004,
    DW_TAG_formal_parameter = 0x0005,
    DW_TAG_global_subroutine = 0x0006,
    DW_TAG_global_variable = 0x0007,
    DW_TAG_label = 0x000a,
    DW_TAG_lexical_block = 0x000b,
    DW_TAG_local_variable = 0x000c,
    DW_TAG_member = 0x000d,
    DW_TAG_pointer_type = 0x000f,
    DW_TAG_reference_type = 0x0010,
    DW_TAG_compile_unit = 0x0011,
    DW_TAG_string_type = 0x0012,
    DW_TAG_structure_type = 0x0013,
    DW_TAG_subroutine = 0x0014,
    DW_TAG_subroutine_type = 0x0015,
    DW_TAG_typedef = 0x0016,
    DW_TAG_union_type = 0x0017,
    DW_TAG_unspecified_parameters = 0x0018,
    DW_TAG_variant = 0x0019,
    DW_TAG_common_block = 0x001a,
    DW_TAG_common_inclusion = 0x001b,
    DW_TAG_inheritance = 0x001c,
    DW_TAG_inlined_subroutine = 0x001d,
    DW_TAG_module = 0x001e,
    DW_TAG_ptr_to_member_type = 0x001f,
    DW_TAG_set_type = 0x0020,
    DW_TAG_subrange_type = 0x0021,
    DW_TAG_with_stmt = 0x0022,
    DW_TAG_lo_user = 0x4080,
    DW_TAG_hi_user = 0xffff,
}, aliases {
    DW_TAG_source_file = 0x0011,
});

dw!(
/// The encoding of an attribute value, stored in the low four bits of the
/// attribute name.
DwForm(u16) {
    DW_FORM_addr = 0x1,
    DW_FORM_ref = 0x2,
    DW_FORM_block2 = 0x3,
    DW_FORM_block4 = 0x4,
    DW_FORM_data2 = 0x5,
    DW_FORM_data4 = 0x6,
    DW_FORM_data8 = 0x7,
    DW_FORM_string = 0x8,
});

dw!(
/// An attribute name. The form is part of the value.
DwAt(u16) {
    DW_AT_sibling = 0x0010 | 0x2,
    DW_AT_location = 0x0020 | 0x3,
    DW_AT_name = 0x0030 | 0x8,
    DW_AT_fund_type = 0x0050 | 0x5,
    DW_AT_mod_fund_type = 0x0060 | 0x3,
    DW_AT_user_def_type = 0x0070 | 0x2,
    DW_AT_mod_u_d_type = 0x0080 | 0x3,
    DW_AT_ordering = 0x0090 | 0x5,
    DW_AT_subscr_data = 0x00a0 | 0x3,
    DW_AT_byte_size = 0x00b0 | 0x6,
    DW_AT_bit_offset = 0x00c0 | 0x5,
    DW_AT_bit_size = 0x00d0 | 0x6,
    DW_AT_element_list = 0x00f0 | 0x4,
    DW_AT_stmt_list = 0x0100 | 0x6,
    DW_AT_low_pc = 0x0110 | 0x1,
    DW_AT_high_pc = 0x0120 | 0x1,
    DW_AT_language = 0x0130 | 0x6,
    DW_AT_member = 0x0140 | 0x2,
    DW_AT_discr = 0x0150 | 0x2,
    DW_AT_discr_value = 0x0160 | 0x3,
    DW_AT_string_length = 0x0190 | 0x3,
    DW_AT_common_reference = 0x01a0 | 0x2,
    DW_AT_comp_dir = 0x01b0 | 0x8,
    DW_AT_const_value_string = 0x01c0 | 0x8,
    DW_AT_const_value_data2 = 0x01c0 | 0x5,
    DW_AT_const_value_data4 = 0x01c0 | 0x6,
    DW_AT_const_value_data8 = 0x01c0 | 0x7,
    DW_AT_const_value_block2 = 0x01c0 | 0x3,
    DW_AT_const_value_block4 = 0x01c0 | 0x4,
    DW_AT_containing_type = 0x01d0 | 0x2,
    DW_AT_default_value_addr = 0x01e0 | 0x1,
    DW_AT_default_value_data2 = 0x01e0 | 0x5,
    DW_AT_default_value_data8 = 0x01e0 | 0x7,
    DW_AT_default_value_string = 0x01e0 | 0x8,
    DW_AT_friends = 0x01f0 | 0x3,
    DW_AT_inline = 0x0200 | 0x8,
    DW_AT_is_optional = 0x0210 | 0x8,
    DW_AT_lower_bound_ref = 0x0220 | 0x2,
    DW_AT_lower_bound_data2 = 0x0220 | 0x5,
    DW_AT_lower_bound_data4 = 0x0220 | 0x6,
    DW_AT_lower_bound_data8 = 0x0220 | 0x7,
    DW_AT_program = 0x0230 | 0x8,
    DW_AT_private = 0x0240 | 0x8,
    DW_AT_producer = 0x0250 | 0x8,
    DW_AT_protected = 0x0260 | 0x8,
    DW_AT_prototyped = 0x0270 | 0x8,
    DW_AT_public = 0x0280 | 0x8,
    DW_AT_pure_virtual = 0x0290 | 0x8,
    DW_AT_return_addr = 0x02a0 | 0x3,
    DW_AT_specification = 0x02b0 | 0x2,
    DW_AT_start_scope = 0x02c0 | 0x6,
    DW_AT_stride_size = 0x02e0 | 0x6,
    DW_AT_upper_bound_ref = 0x02f0 | 0x2,
    DW_AT_upper_bound_data2 = 0x02f0 | 0x5,
    DW_AT_upper_bound_data4 = 0x02f0 | 0x6,
    DW_AT_upper_bound_data8 = 0x02f0 | 0x7,
    DW_AT_virtual = 0x0300 | 0x8,
    // producer extension in the user range
    DW_AT_mangled_name = 0x2000 | 0x8,
});

impl DwAt {
    pub fn form(self) -> DwForm {
        DwForm(self.0 & 0xf)
    }

    /// Whether this attribute describes the type of its entry.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            DW_AT_fund_type | DW_AT_user_def_type | DW_AT_mod_fund_type | DW_AT_mod_u_d_type
        )
    }
}

dw!(
/// Location expression opcodes.
DwOp(u8) {
    DW_OP_reg = 0x01,
    DW_OP_basereg = 0x02,
    DW_OP_addr = 0x03,
    DW_OP_const = 0x04,
    DW_OP_deref2 = 0x05,
    DW_OP_deref4 = 0x06,
    DW_OP_add = 0x07,
    DW_OP_lo_user = 0xe0,
    DW_OP_hi_user = 0xff,
}, aliases {
    DW_OP_deref = 0x06,
});

impl DwOp {
    /// Size of the inline operand that follows the opcode.
    pub fn operand_size(self) -> usize {
        match self {
            DW_OP_reg | DW_OP_basereg | DW_OP_addr | DW_OP_const => 4,
            _ => 0,
        }
    }
}

dw!(
/// Fundamental type codes.
DwFt(u16) {
    DW_FT_char = 0x0001,
    DW_FT_signed_char = 0x0002,
    DW_FT_unsigned_char = 0x0003,
    DW_FT_short = 0x0004,
    DW_FT_signed_short = 0x0005,
    DW_FT_unsigned_short = 0x0006,
    DW_FT_integer = 0x0007,
    DW_FT_signed_integer = 0x0008,
    DW_FT_unsigned_integer = 0x0009,
    DW_FT_long = 0x000a,
    DW_FT_signed_long = 0x000b,
    DW_FT_unsigned_long = 0x000c,
    DW_FT_pointer = 0x000d,
    DW_FT_float = 0x000e,
    DW_FT_dbl_prec_float = 0x000f,
    DW_FT_ext_prec_float = 0x0010,
    DW_FT_complex = 0x0011,
    DW_FT_dbl_prec_complex = 0x0012,
    DW_FT_void = 0x0014,
    DW_FT_boolean = 0x0015,
    DW_FT_ext_prec_complex = 0x0016,
    DW_FT_label = 0x0017,
    DW_FT_lo_user = 0x8000,
    DW_FT_long_long = 0x8008,
    DW_FT_signed_long_long = 0x8108,
    DW_FT_unsigned_long_long = 0x8208,
    DW_FT_hi_user = 0xffff,
});

dw!(
/// Type modifier codes used in `DW_AT_mod_fund_type` and
/// `DW_AT_mod_u_d_type` blocks.
DwMod(u8) {
    DW_MOD_pointer_to = 0x01,
    DW_MOD_reference_to = 0x02,
    DW_MOD_const = 0x03,
    DW_MOD_volatile = 0x04,
    DW_MOD_lo_user = 0x80,
    DW_MOD_hi_user = 0xff,
});

dw!(
/// Source language of a compile unit.
DwLang(u32) {
    DW_LANG_C89 = 0x0001,
    DW_LANG_C = 0x0002,
    DW_LANG_Ada83 = 0x0003,
    DW_LANG_C_plus_plus = 0x0004,
    DW_LANG_Cobol74 = 0x0005,
    DW_LANG_Cobol85 = 0x0006,
    DW_LANG_Fortran77 = 0x0007,
    DW_LANG_Fortran90 = 0x0008,
    DW_LANG_Pascal83 = 0x0009,
    DW_LANG_Modula2 = 0x000a,
    DW_LANG_lo_user = 0x8000,
    DW_LANG_hi_user = 0xffff,
});

dw!(
/// Array element ordering.
DwOrd(u16) {
    DW_ORD_row_major = 0,
    DW_ORD_col_major = 1,
});

dw!(
/// Array subscript format specifiers in `DW_AT_subscr_data`.
DwFmt(u8) {
    DW_FMT_FT_C_C = 0x0,
    DW_FMT_FT_C_X = 0x1,
    DW_FMT_FT_X_C = 0x2,
    DW_FMT_FT_X_X = 0x3,
    DW_FMT_UT_C_C = 0x4,
    DW_FMT_UT_C_X = 0x5,
    DW_FMT_UT_X_C = 0x6,
    DW_FMT_UT_X_X = 0x7,
    DW_FMT_ET = 0x8,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_forms() {
        assert_eq!(DW_AT_sibling.form(), DW_FORM_ref);
        assert_eq!(DW_AT_name.form(), DW_FORM_string);
        assert_eq!(DW_AT_element_list.form(), DW_FORM_block4);
        assert_eq!(DW_AT_low_pc.form(), DW_FORM_addr);
        assert_eq!(DW_AT_mangled_name.form(), DW_FORM_string);
        assert_eq!(DW_AT_const_value_data8.form(), DW_FORM_data8);
    }

    #[test]
    fn type_attributes() {
        assert!(DW_AT_mod_u_d_type.is_type());
        assert!(DW_AT_fund_type.is_type());
        assert!(!DW_AT_name.is_type());
        assert!(!DW_AT_sibling.is_type());
    }

    #[test]
    fn display() {
        assert_eq!(DW_TAG_compile_unit.to_string(), "DW_TAG_compile_unit");
        assert_eq!(DW_TAG_source_file.to_string(), "DW_TAG_compile_unit");
        assert_eq!(DwTag(0x9999).to_string(), "Unknown DwTag: 0x9999");
        assert_eq!(DW_FT_long_long.to_string(), "DW_FT_long_long");
        assert_eq!(DW_LANG_C_plus_plus.to_string(), "DW_LANG_C_plus_plus");
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(DW_OP_const.operand_size(), 4);
        assert_eq!(DW_OP_basereg.operand_size(), 4);
        assert_eq!(DW_OP_add.operand_size(), 0);
        assert_eq!(DW_OP_deref.operand_size(), 0);
    }
}
