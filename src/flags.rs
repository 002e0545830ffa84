use bitflags::bitflags;

bitflags! {
    /// The SC_* flag byte of a class descriptor.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct DescFlags: u8 {
        const WriteMethod = 0x01;
        const Serializable = 0x02;
        const Externalizable = 0x04;
        const BlockData = 0x08;
        const Enum = 0x10;
    }
}

impl DescFlags {
    /// The low nibble, which selects the per-class data layout.
    pub fn data_layout(self) -> u8 {
        self.bits() & 0x0f
    }
}
