use data_units::ByteUnits;

/// Language options that change how records are laid out.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Records are C++ records, which are never zero-sized
    pub cplusplus: bool,

    /// `-fpack-struct=N`, the default maximum field alignment
    pub pack_struct: Option<ByteUnits>,

    /// `-mms-bitfields`, lays out every record as if it had `ms_struct`
    pub ms_bitfields: bool,

    /// Log every newly computed record layout
    pub dump_record_layouts: bool,
}

impl LayoutOptions {
    pub fn c() -> Self {
        Self::default()
    }

    pub fn cplusplus() -> Self {
        Self {
            cplusplus: true,
            ..Default::default()
        }
    }
}
