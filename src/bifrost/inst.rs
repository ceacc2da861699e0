// This module defines the Bifrost machine instruction descriptor produced by the lowering
// routines. An Inst is a plain value: an opcode class with its class-specific modifier, a
// typed destination, up to four typed source operands with per-operand swizzle and negate
// flags, and a 64-bit constant payload that some classes split into two 32-bit immediates.
// Operands are a tagged union (register, hardware zero, fast-access uniform slot, constant
// half) so every consumer has to handle every kind. Instructions are built with consuming
// builder methods and are never mutated after emission. The Display implementation gives
// the one-line textual form used by logging, the bilower driver and FileCheck tests.

//! Bifrost instruction descriptors.

use std::fmt;

/// Maximum number of source operands of a Bifrost instruction.
pub const MAX_SRCS: usize = 4;

/// Type tag of a destination or source operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluType {
    Float(u8),
    Int(u8),
    Uint(u8),
}

impl AluType {
    pub const F32: AluType = AluType::Float(32);
    pub const I32: AluType = AluType::Int(32);
    pub const U32: AluType = AluType::Uint(32);
    pub const U8: AluType = AluType::Uint(8);

    /// Float type of the given width.
    pub const fn float(bits: u8) -> Self {
        AluType::Float(bits)
    }
}

impl fmt::Display for AluType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AluType::Float(bits) => write!(f, "f{}", bits),
            AluType::Int(bits) => write!(f, "i{}", bits),
            AluType::Uint(bits) => write!(f, "u{}", bits),
        }
    }
}

/// Virtual register: an SSA value of the input program or a pass temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Value(u32),
    Temp(u32),
}

impl Reg {
    pub fn is_temp(self) -> bool {
        matches!(self, Reg::Temp(_))
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Value(idx) => write!(f, "r{}", idx),
            Reg::Temp(idx) => write!(f, "t{}", idx),
        }
    }
}

/// Fast-access uniform special slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FauSlot {
    LaneId,
}

/// Half of the 64-bit constant payload read by a constant operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstHalf {
    Lo,
    Hi,
}

/// Source operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Index {
    /// Unused slot.
    #[default]
    None,
    Reg(Reg),
    /// Hardware zero.
    Zero,
    Fau(FauSlot),
    Constant(ConstHalf),
}

impl Index {
    pub fn as_reg(self) -> Option<Reg> {
        match self {
            Index::Reg(reg) => Some(reg),
            _ => None,
        }
    }

    pub fn is_none(self) -> bool {
        self == Index::None
    }
}

impl From<Reg> for Index {
    fn from(reg: Reg) -> Self {
        Index::Reg(reg)
    }
}

/// 64-bit constant payload of an instruction.
///
/// The split is class specific:
/// - `FMA.mscale`: low word is the f32 multiplicand, high word the i32 scale
///   exponent (`x * lo * 2^hi`).
/// - `ADD_FREXPM`: low word is the f32 addend.
/// - bitwise and integer add: low word is the u32 operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Constant(u64);

impl Constant {
    pub const fn from_halves(lo: u32, hi: u32) -> Self {
        Self((lo as u64) | ((hi as u64) << 32))
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn lo(self) -> u32 {
        self.0 as u32
    }

    pub const fn hi(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn lo_f32(self) -> f32 {
        f32::from_bits(self.lo())
    }

    pub const fn half(self, half: ConstHalf) -> u32 {
        match half {
            ConstHalf::Lo => self.lo(),
            ConstHalf::Hi => self.hi(),
        }
    }
}

/// Component selector of one source operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    /// Read `component` in the first channel.
    pub const fn scalar(component: u8) -> Self {
        Self([component, 0, 0, 0])
    }

    pub const fn component(self) -> u8 {
        self.0[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundMode {
    /// Class default, no explicit mode.
    None,
    /// Round toward zero.
    Rtz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrexpOp {
    /// Exponent extraction adjusted for log2 range reduction.
    LogExponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Add a constant to the frexp mantissa of the second source.
    AddFrexpm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableOp {
    /// log2(u) / (u - 1) over the reduced mantissa, low part.
    Log2UOverU1Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitwiseOp {
    And,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImathOp {
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialOp {
    /// FEXP2_FAST, low part of the two-step exp2 approximation.
    Exp2Low,
    ClperV6,
    ClperV7,
}

impl SpecialOp {
    pub fn is_clper(self) -> bool {
        matches!(self, SpecialOp::ClperV6 | SpecialOp::ClperV7)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubgroupSize {
    /// The 2x2 quad.
    Subgroup4,
}

impl SubgroupSize {
    pub fn lanes(self) -> u32 {
        match self {
            SubgroupSize::Subgroup4 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneOp {
    /// Read the addressed lane as is.
    None,
}

/// Value returned when the addressed lane is inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InactiveResult {
    Zero,
}

/// Lane permute modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClperParams {
    pub subgroup: SubgroupSize,
    pub lane_op: LaneOp,
    pub inactive: InactiveResult,
}

/// Opcode class with its class-specific modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstClass {
    Fma { mscale: bool },
    Convert,
    Frexp(FrexpOp),
    ReduceFma(ReduceOp),
    Table(TableOp),
    Bitwise(BitwiseOp),
    Imath(ImathOp),
    Mov,
    SpecialAdd(SpecialOp),
    Add,
}

impl InstClass {
    /// Class name, without modifiers.
    pub fn name(self) -> &'static str {
        match self {
            InstClass::Fma { .. } => "fma",
            InstClass::Convert => "convert",
            InstClass::Frexp(_) => "frexp",
            InstClass::ReduceFma(_) => "reduce_fma",
            InstClass::Table(_) => "table",
            InstClass::Bitwise(_) => "bitwise",
            InstClass::Imath(_) => "imath",
            InstClass::Mov => "mov",
            InstClass::SpecialAdd(_) => "special",
            InstClass::Add => "add",
        }
    }

    /// Assembly mnemonic including the class modifier.
    pub fn mnemonic(self) -> &'static str {
        match self {
            InstClass::Fma { mscale: false } => "fma",
            InstClass::Fma { mscale: true } => "fma.mscale",
            InstClass::Convert => "convert",
            InstClass::Frexp(FrexpOp::LogExponent) => "frexpe.log",
            InstClass::ReduceFma(ReduceOp::AddFrexpm) => "add_frexpm",
            InstClass::Table(TableOp::Log2UOverU1Low) => "table.log2_u_over_u_1_low",
            InstClass::Bitwise(BitwiseOp::And) => "and",
            InstClass::Imath(ImathOp::Add) => "iadd",
            InstClass::Mov => "mov",
            InstClass::SpecialAdd(SpecialOp::Exp2Low) => "fexp2_fast",
            InstClass::SpecialAdd(SpecialOp::ClperV6) => "clper_v6",
            InstClass::SpecialAdd(SpecialOp::ClperV7) => "clper_v7",
            InstClass::Add => "add",
        }
    }

    /// Classes whose result is raw bits moved from elsewhere; consumers may
    /// read it under a different type tag.
    pub fn is_data_movement(self) -> bool {
        match self {
            InstClass::Mov => true,
            InstClass::SpecialAdd(op) => op.is_clper(),
            _ => false,
        }
    }
}

/// One Bifrost machine instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inst {
    pub class: InstClass,
    pub dest: Reg,
    pub dest_type: AluType,
    pub src: [Index; MAX_SRCS],
    pub src_types: [Option<AluType>; MAX_SRCS],
    pub swizzle: [Swizzle; MAX_SRCS],
    pub src_neg: [bool; MAX_SRCS],
    pub constant: Constant,
    pub round: RoundMode,
    pub clper: Option<ClperParams>,
}

impl Inst {
    pub fn new(class: InstClass, dest: Reg, dest_type: AluType) -> Self {
        Self {
            class,
            dest,
            dest_type,
            src: [Index::None; MAX_SRCS],
            src_types: [None; MAX_SRCS],
            swizzle: [Swizzle::default(); MAX_SRCS],
            src_neg: [false; MAX_SRCS],
            constant: Constant::default(),
            round: RoundMode::None,
            clper: None,
        }
    }

    pub fn src(mut self, slot: usize, index: impl Into<Index>, ty: AluType) -> Self {
        self.src[slot] = index.into();
        self.src_types[slot] = Some(ty);
        self
    }

    pub fn swizzle(mut self, slot: usize, swizzle: Swizzle) -> Self {
        self.swizzle[slot] = swizzle;
        self
    }

    pub fn neg(mut self, slot: usize) -> Self {
        self.src_neg[slot] = true;
        self
    }

    pub fn constant(mut self, constant: Constant) -> Self {
        self.constant = constant;
        self
    }

    pub fn round(mut self, round: RoundMode) -> Self {
        self.round = round;
        self
    }

    pub fn clper(mut self, params: ClperParams) -> Self {
        self.clper = Some(params);
        self
    }

    /// Used source slots with their operand and type.
    pub fn sources(&self) -> impl Iterator<Item = (usize, Index, Option<AluType>)> + '_ {
        self.src
            .iter()
            .enumerate()
            .filter(|(_, index)| !index.is_none())
            .map(move |(slot, index)| (slot, *index, self.src_types[slot]))
    }

    /// Register sources, in slot order.
    pub fn reg_sources(&self) -> impl Iterator<Item = (usize, Reg)> + '_ {
        self.sources()
            .filter_map(|(slot, index, _)| index.as_reg().map(|reg| (slot, reg)))
    }

    pub fn reads(&self, reg: Reg) -> bool {
        self.reg_sources().any(|(_, r)| r == reg)
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, slot: usize) -> fmt::Result {
        if self.src_neg[slot] {
            f.write_str("-")?;
        }
        match self.src[slot] {
            Index::None => f.write_str("_")?,
            Index::Reg(reg) => {
                write!(f, "{}", reg)?;
                match self.swizzle[slot].component() {
                    0 => {}
                    c @ 1..=3 => write!(f, ".{}", ['x', 'y', 'z', 'w'][c as usize])?,
                    c => write!(f, ".c{}", c)?,
                }
            }
            Index::Zero => f.write_str("#0")?,
            Index::Fau(FauSlot::LaneId) => f.write_str("lane_id")?,
            Index::Constant(half) => write!(f, "#{:#x}", self.constant.half(half))?,
        }
        if let Some(ty) = self.src_types[slot] {
            write!(f, ":{}", ty)?;
        }
        Ok(())
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class.mnemonic())?;
        match self.round {
            RoundMode::None => {}
            RoundMode::Rtz => f.write_str(".rtz")?,
        }
        if let Some(params) = self.clper {
            write!(f, ".subgroup{}", params.subgroup.lanes())?;
            match params.lane_op {
                LaneOp::None => {}
            }
            match params.inactive {
                InactiveResult::Zero => f.write_str(".inactive_zero")?,
            }
        }
        write!(f, " {}:{}", self.dest, self.dest_type)?;
        for slot in 0..MAX_SRCS {
            if !self.src[slot].is_none() {
                f.write_str(", ")?;
                self.fmt_operand(f, slot)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_halves() {
        let c = Constant::from_halves(0x3f80_0000, 24);
        assert_eq!(c.bits(), 0x0000_0018_3f80_0000);
        assert_eq!(c.lo(), 0x3f80_0000);
        assert_eq!(c.hi(), 24);
        assert_eq!(c.lo_f32(), 1.0);
        assert_eq!(c.half(ConstHalf::Hi), 24);
    }

    #[test]
    fn test_float_tag() {
        assert_eq!(AluType::float(16), AluType::Float(16));
        assert_eq!(AluType::float(32), AluType::F32);
        assert_eq!(AluType::float(16).to_string(), "f16");
    }

    #[test]
    fn test_builder_sets_slots() {
        let inst = Inst::new(InstClass::Add, Reg::Value(3), AluType::F32)
            .src(0, Reg::Temp(1), AluType::F32)
            .src(1, Reg::Temp(0), AluType::F32)
            .neg(1);

        assert_eq!(inst.sources().count(), 2);
        assert!(inst.reads(Reg::Temp(0)));
        assert!(!inst.reads(Reg::Value(3)));
        assert_eq!(inst.src_neg, [false, true, false, false]);
    }

    #[test]
    fn test_display_mscale() {
        let inst = Inst::new(InstClass::Fma { mscale: true }, Reg::Temp(0), AluType::F32)
            .src(0, Reg::Value(0), AluType::F32)
            .src(1, Index::Constant(ConstHalf::Lo), AluType::F32)
            .src(2, Index::Zero, AluType::F32)
            .src(3, Index::Constant(ConstHalf::Hi), AluType::I32)
            .constant(Constant::from_halves(0x3f80_0000, 24));

        assert_eq!(
            inst.to_string(),
            "fma.mscale t0:f32, r0:f32, #0x3f800000:f32, #0:f32, #0x18:i32"
        );
    }

    #[test]
    fn test_display_swizzle_and_neg() {
        let inst = Inst::new(InstClass::Add, Reg::Value(2), AluType::Float(16))
            .src(0, Reg::Value(1), AluType::Float(16))
            .swizzle(0, Swizzle::scalar(2))
            .src(1, Reg::Temp(4), AluType::Float(16))
            .neg(1);

        assert_eq!(inst.to_string(), "add r2:f16, r1.z:f16, -t4:f16");
    }

    #[test]
    fn test_display_clper() {
        let inst = Inst::new(InstClass::SpecialAdd(SpecialOp::ClperV7), Reg::Temp(3), AluType::U32)
            .clper(ClperParams {
                subgroup: SubgroupSize::Subgroup4,
                lane_op: LaneOp::None,
                inactive: InactiveResult::Zero,
            })
            .src(0, Reg::Value(1), AluType::U32)
            .src(1, Reg::Temp(1), AluType::U32);

        assert_eq!(
            inst.to_string(),
            "clper_v7.subgroup4.inactive_zero t3:u32, r1:u32, t1:u32"
        );
    }

    #[test]
    fn test_data_movement_classes() {
        assert!(InstClass::Mov.is_data_movement());
        assert!(InstClass::SpecialAdd(SpecialOp::ClperV6).is_data_movement());
        assert!(!InstClass::SpecialAdd(SpecialOp::Exp2Low).is_data_movement());
        assert!(!InstClass::Add.is_data_movement());
    }
}
