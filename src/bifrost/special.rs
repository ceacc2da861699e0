// This module lowers the special functions Bifrost has no single instruction for: exp2,
// log2 and the screen-space derivatives. Each routine builds a short, fixed sequence of
// instruction descriptors against an EmitContext, allocating temporaries as it goes and
// writing only the last instruction to the node's destination. exp2 pre-scales the input
// into 8.24 fixed point with FMA_MSCALE, converts it to an integer and feeds both to
// FEXP2_FAST. log2 splits the input frexp-style, looks up log2(u)/(u-1) for the mantissa
// and recombines with an FMA. Derivatives read the source from the two lanes of the quad
// that differ along the requested axis with CLPER and subtract. The exp2/log2 sequences are
// the second-generation strategy; first-generation parts fall back to them or, under the
// strict policy, are refused.

//! Special-function lowering.

use super::context::EmitContext;
use super::inst::{
    AluType, BitwiseOp, ClperParams, ConstHalf, Constant, FauSlot, FrexpOp, ImathOp,
    InactiveResult, Index, Inst, InstClass, LaneOp, ReduceOp, Reg, RoundMode, SpecialOp,
    SubgroupSize, Swizzle, TableOp,
};
use crate::core::{LowerError, LowerResult, TargetPolicy};
use crate::ir::{AluInstr, AluOp};

/// 1.0f
pub const ONE_F32_BITS: u32 = 0x3f80_0000;

/// -1.0f
pub const NEG_ONE_F32_BITS: u32 = 0xbf80_0000;

/// FEXP2_FAST takes its input as 8.24 fixed point.
pub const EXP2_FIXED_POINT_SHIFT: u32 = 24;

/// Quads are laid out with bit 0 of the lane id selecting the x half and
/// bit 1 the y half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivDirection {
    X,
    Y,
}

impl DerivDirection {
    /// Mask applied to the lane id to find the first lane of the pair.
    pub const fn lane_mask(self) -> u32 {
        match self {
            DerivDirection::X => 2,
            DerivDirection::Y => 1,
        }
    }

    /// Added to the masked lane id to find the second lane of the pair.
    pub const fn pair_offset(self) -> u32 {
        match self {
            DerivDirection::X => 1,
            DerivDirection::Y => 2,
        }
    }
}

/// Lower one ALU node handled by this module.
pub fn lower_alu<C: EmitContext>(ctx: &mut C, instr: &AluInstr) -> LowerResult<()> {
    match instr.op {
        AluOp::Fexp2 => emit_fexp2(ctx, instr),
        AluOp::Flog2 => emit_flog2(ctx, instr),
        AluOp::Fddx => emit_deriv(ctx, instr, DerivDirection::X),
        AluOp::Fddy => emit_deriv(ctx, instr, DerivDirection::Y),
        op => Err(LowerError::UnsupportedOp { op }),
    }
}

pub fn emit_fexp2<C: EmitContext>(ctx: &mut C, instr: &AluInstr) -> LowerResult<()> {
    // TODO: G71 needs its own sequence
    let native = ctx.arch().caps().native_fexp2;
    check_strategy(ctx, instr.op, native)?;
    emit_fexp2_new(ctx, instr);
    Ok(())
}

pub fn emit_flog2<C: EmitContext>(ctx: &mut C, instr: &AluInstr) -> LowerResult<()> {
    let native = ctx.arch().caps().native_flog2;
    check_strategy(ctx, instr.op, native)?;
    emit_flog2_new(ctx, instr);
    Ok(())
}

fn check_strategy<C: EmitContext>(ctx: &mut C, op: AluOp, native: bool) -> LowerResult<()> {
    if native {
        return Ok(());
    }
    match ctx.target_policy() {
        TargetPolicy::Strict => Err(LowerError::UnsupportedTarget {
            op,
            arch: ctx.arch(),
        }),
        TargetPolicy::Fallback => {
            ctx.note_fallback(op);
            Ok(())
        }
    }
}

fn src_index(instr: &AluInstr) -> Index {
    Index::Reg(Reg::Value(instr.src.value))
}

fn src_swizzle(instr: &AluInstr) -> Swizzle {
    Swizzle::scalar(instr.src.swizzle[0])
}

fn dest_reg(instr: &AluInstr) -> Reg {
    Reg::Value(instr.dest)
}

/// exp2 on second-generation Bifrost.
pub fn emit_fexp2_new<C: EmitContext>(ctx: &mut C, instr: &AluInstr) {
    let x = src_index(instr);
    let swizzle = src_swizzle(instr);

    // FMA_MSCALE T, X, 1.0, 0, 0x18
    let mscale = Inst::new(InstClass::Fma { mscale: true }, ctx.make_temp(), AluType::F32)
        .src(0, x, AluType::F32)
        .swizzle(0, swizzle)
        .src(1, Index::Constant(ConstHalf::Lo), AluType::F32)
        .src(2, Index::Zero, AluType::F32)
        .src(3, Index::Constant(ConstHalf::Hi), AluType::I32)
        .constant(Constant::from_halves(ONE_F32_BITS, EXP2_FIXED_POINT_SHIFT));

    // F2I T, T
    let f2i = Inst::new(InstClass::Convert, ctx.make_temp(), AluType::I32)
        .src(0, mscale.dest, AluType::F32)
        .round(RoundMode::None);

    // FEXP2_FAST T, T, X
    let fexp = Inst::new(
        InstClass::SpecialAdd(SpecialOp::Exp2Low),
        dest_reg(instr),
        AluType::F32,
    )
    .src(0, f2i.dest, AluType::I32)
    .src(1, mscale.src[0], AluType::F32)
    .swizzle(1, swizzle);

    ctx.emit(mscale);
    ctx.emit(f2i);
    ctx.emit(fexp);
}

/// log2 on second-generation Bifrost.
///
/// With `x = u * 2^e`, `log2(x) = log2(u)/(u - 1) * (u - 1) + e`.
pub fn emit_flog2_new<C: EmitContext>(ctx: &mut C, instr: &AluInstr) {
    let x = src_index(instr);
    let swizzle = src_swizzle(instr);

    // LOG_FREXPE e, X
    let frexpe = Inst::new(
        InstClass::Frexp(FrexpOp::LogExponent),
        ctx.make_temp(),
        AluType::I32,
    )
    .src(0, x, AluType::F32)
    .swizzle(0, swizzle);

    // I32_TO_F32 e
    let i2f = Inst::new(InstClass::Convert, ctx.make_temp(), AluType::F32)
        .src(0, frexpe.dest, AluType::I32)
        .round(RoundMode::Rtz);

    // ADD_FREXPM (u - 1), -1.0, X
    let x_minus_1 = Inst::new(
        InstClass::ReduceFma(ReduceOp::AddFrexpm),
        ctx.make_temp(),
        AluType::F32,
    )
    .src(0, Index::Constant(ConstHalf::Lo), AluType::F32)
    .src(1, x, AluType::F32)
    .swizzle(1, swizzle)
    .constant(Constant::from_halves(NEG_ONE_F32_BITS, 0));

    // FLOG2_HELP log2(u)/(u - 1), X
    let help = Inst::new(
        InstClass::Table(TableOp::Log2UOverU1Low),
        ctx.make_temp(),
        AluType::F32,
    )
    .src(0, x, AluType::F32)
    .swizzle(0, swizzle);

    // FMA log2(u)/(u - 1), (u - 1), e
    let fma = Inst::new(InstClass::Fma { mscale: false }, dest_reg(instr), AluType::F32)
        .src(0, help.dest, AluType::F32)
        .src(1, x_minus_1.dest, AluType::F32)
        .src(2, i2f.dest, AluType::F32);

    ctx.emit(frexpe);
    ctx.emit(i2f);
    ctx.emit(x_minus_1);
    ctx.emit(help);
    ctx.emit(fma);
}

const QUAD_CLPER: ClperParams = ClperParams {
    subgroup: SubgroupSize::Subgroup4,
    lane_op: LaneOp::None,
    inactive: InactiveResult::Zero,
};

/// Screen-space derivative along `direction`.
pub fn emit_deriv<C: EmitContext>(
    ctx: &mut C,
    instr: &AluInstr,
    direction: DerivDirection,
) -> LowerResult<()> {
    // The FP add has 16- and 32-bit forms only; Bifrost has no fp64 and no fp8.
    let ty = match instr.dest_bit_size {
        16 => AluType::float(16),
        32 => AluType::float(32),
        bits => {
            return Err(LowerError::InvalidBitSize {
                op: instr.op,
                bits,
            })
        }
    };
    let clper_op = ctx.arch().caps().clper;

    let cur_lane = Inst::new(InstClass::Mov, ctx.make_temp(), AluType::U32)
        .src(0, Index::Fau(FauSlot::LaneId), AluType::U32);

    let lane1 = Inst::new(InstClass::Bitwise(BitwiseOp::And), ctx.make_temp(), AluType::U32)
        .src(0, cur_lane.dest, AluType::U32)
        .src(1, Index::Constant(ConstHalf::Lo), AluType::U32)
        .src(2, Index::Zero, AluType::U8)
        .constant(Constant::from_halves(direction.lane_mask(), 0));

    let lane2 = Inst::new(InstClass::Imath(ImathOp::Add), ctx.make_temp(), AluType::U32)
        .src(0, lane1.dest, AluType::U32)
        .src(1, Index::Constant(ConstHalf::Lo), AluType::U32)
        .src(2, Index::Zero, AluType::U32)
        .constant(Constant::from_halves(direction.pair_offset(), 0));

    let src = src_index(instr);
    let swizzle = src_swizzle(instr);

    let clper1 = Inst::new(InstClass::SpecialAdd(clper_op), ctx.make_temp(), AluType::U32)
        .clper(QUAD_CLPER)
        .src(0, src, AluType::U32)
        .swizzle(0, swizzle)
        .src(1, lane1.dest, AluType::U32);

    let clper2 = Inst::new(InstClass::SpecialAdd(clper_op), ctx.make_temp(), AluType::U32)
        .clper(QUAD_CLPER)
        .src(0, src, AluType::U32)
        .swizzle(0, swizzle)
        .src(1, lane2.dest, AluType::U32);

    let sub = Inst::new(InstClass::Add, dest_reg(instr), ty)
        .src(0, clper2.dest, ty)
        .src(1, clper1.dest, ty)
        .neg(1);

    ctx.emit(cur_lane);
    ctx.emit(lane1);
    ctx.emit(lane2);
    ctx.emit(clper1);
    ctx.emit(clper2);
    ctx.emit(sub);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bifrost::arch::Arch;
    use crate::ir::AluSrc;

    /// Minimal context relying on the trait defaults.
    struct RecordingContext {
        arch: Arch,
        next_temp: u32,
        insts: Vec<Inst>,
    }

    impl RecordingContext {
        fn new(arch: Arch) -> Self {
            Self {
                arch,
                next_temp: 0,
                insts: Vec::new(),
            }
        }
    }

    impl EmitContext for RecordingContext {
        fn arch(&self) -> Arch {
            self.arch
        }

        fn make_temp(&mut self) -> Reg {
            self.next_temp += 1;
            Reg::Temp(self.next_temp - 1)
        }

        fn emit(&mut self, inst: Inst) {
            self.insts.push(inst);
        }
    }

    #[test]
    fn test_float_constants() {
        assert_eq!(ONE_F32_BITS, 1.0f32.to_bits());
        assert_eq!(NEG_ONE_F32_BITS, (-1.0f32).to_bits());
    }

    #[test]
    fn test_direction_constants() {
        assert_eq!(DerivDirection::X.lane_mask(), 2);
        assert_eq!(DerivDirection::X.pair_offset(), 1);
        assert_eq!(DerivDirection::Y.lane_mask(), 1);
        assert_eq!(DerivDirection::Y.pair_offset(), 2);
    }

    #[test]
    fn test_default_policy_falls_back() {
        let mut ctx = RecordingContext::new(Arch::V6);
        let instr = AluInstr::new(AluOp::Flog2, AluSrc::new(0), 1, 32);

        lower_alu(&mut ctx, &instr).unwrap();
        assert_eq!(ctx.insts.len(), 5);
    }

    #[test]
    fn test_exp2_sequence() {
        let mut ctx = RecordingContext::new(Arch::V7);
        let instr = AluInstr::new(AluOp::Fexp2, AluSrc::with_component(0, 3), 5, 32);
        emit_fexp2(&mut ctx, &instr).unwrap();

        let [mscale, f2i, fexp] = ctx.insts.as_slice() else {
            panic!("expected three instructions, got {}", ctx.insts.len());
        };
        assert_eq!(mscale.constant.lo(), ONE_F32_BITS);
        assert_eq!(mscale.constant.hi(), EXP2_FIXED_POINT_SHIFT);
        assert_eq!(mscale.swizzle[0], Swizzle::scalar(3));
        assert_eq!(f2i.src[0], Index::Reg(mscale.dest));
        assert_eq!(f2i.round, RoundMode::None);
        assert_eq!(fexp.src[0], Index::Reg(f2i.dest));
        assert_eq!(fexp.src[1], Index::Reg(Reg::Value(0)));
        assert_eq!(fexp.swizzle[1], Swizzle::scalar(3));
        assert_eq!(fexp.dest, Reg::Value(5));
    }

    #[test]
    fn test_deriv_rejects_64bit() {
        let mut ctx = RecordingContext::new(Arch::V7);
        let instr = AluInstr::new(AluOp::Fddx, AluSrc::new(0), 1, 64);

        assert_eq!(
            lower_alu(&mut ctx, &instr),
            Err(LowerError::InvalidBitSize {
                op: AluOp::Fddx,
                bits: 64
            })
        );
        assert!(ctx.insts.is_empty());
        assert_eq!(ctx.next_temp, 0);
    }
}
