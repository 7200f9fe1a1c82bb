use luajit_reader::opcode::{Operation, Version};

use super::assembler::{Dump, Knum, Proto};

/// ```lua
/// local x = 1 + 2
/// return x
/// ```
pub fn arithmetic() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(2)
		.ad(Operation::KShort, 1, 1)
		.abc(Operation::AddVN, 0, 1, 0)
		.ad(Operation::Ret1, 0, 2)
		.number(Knum::Integer(2))
		.variable("x", 3, 4);

	Dump::new(Version::V2_1).finish(&main)
}

/// ```lua
/// for i = 1, 3 do
/// 	f(i)
/// end
/// ```
pub fn numeric_for() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(6)
		.string("f")
		.ad(Operation::KShort, 0, 1)
		.ad(Operation::KShort, 1, 3)
		.ad(Operation::KShort, 2, 1)
		.jump(Operation::ForI, 0, 8)
		.ad(Operation::GGet, 4, 0)
		.ad(Operation::Mov, 5, 3)
		.abc(Operation::Call, 4, 1, 2)
		.jump(Operation::ForL, 0, 4)
		.ad(Operation::Ret0, 0, 1);

	Dump::new(Version::V2_1).stripped().finish(&main)
}

/// ```lua
/// if g then
/// 	h(1)
/// else
/// 	h(2)
/// end
/// ```
pub fn if_else() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(3)
		.string("g")
		.string("h")
		.ad(Operation::GGet, 0, 0)
		.ad(Operation::IsF, 0, 0)
		.jump(Operation::Jmp, 1, 7)
		.ad(Operation::GGet, 1, 1)
		.ad(Operation::KShort, 2, 1)
		.abc(Operation::Call, 1, 1, 2)
		.jump(Operation::Jmp, 1, 10)
		.ad(Operation::GGet, 1, 1)
		.ad(Operation::KShort, 2, 2)
		.abc(Operation::Call, 1, 1, 2)
		.ad(Operation::Ret0, 0, 1);

	Dump::new(Version::V2_1).stripped().finish(&main)
}

/// ```lua
/// local i = 0
/// while i < 10 do
/// 	i = i + 1
/// end
/// return i
/// ```
pub fn while_loop() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(2)
		.ad(Operation::KShort, 0, 0)
		.ad(Operation::KShort, 1, 10)
		.ad(Operation::IsGe, 0, 1)
		.jump(Operation::Jmp, 2, 7)
		.jump(Operation::Loop, 1, 7)
		.abc(Operation::AddVN, 0, 0, 0)
		.jump(Operation::Jmp, 1, 1)
		.ad(Operation::Ret1, 0, 2)
		.number(Knum::Integer(1))
		.variable("i", 2, 9);

	Dump::new(Version::V2_1).finish(&main)
}

/// ```lua
/// local count = 0
/// local bump = function()
/// 	count = count + 1
/// end
/// bump()
/// ```
pub fn closure() -> Vec<u8> {
	let bump = Proto::new(Version::V2_1)
		.frame(1)
		.capture_local(0, "count")
		.ad(Operation::UGet, 0, 0)
		.abc(Operation::AddVN, 0, 0, 0)
		.ad(Operation::USetV, 0, 0)
		.ad(Operation::Ret0, 0, 1)
		.number(Knum::Integer(1));

	let main = Proto::main(Version::V2_1)
		.frame(3)
		.child(bump)
		.ad(Operation::KShort, 0, 0)
		.ad(Operation::FNew, 1, 0)
		.ad(Operation::Mov, 2, 1)
		.abc(Operation::Call, 2, 1, 1)
		.ad(Operation::Ret0, 0, 1)
		.variable("count", 2, 6)
		.variable("bump", 3, 6);

	Dump::new(Version::V2_1).finish(&main)
}

/// A global read that cannot move past a store to the same global.
///
/// ```lua
/// local t = a
/// a = 1
/// b = t
/// ```
pub fn hazard() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(2)
		.string("a")
		.string("b")
		.ad(Operation::GGet, 0, 0)
		.ad(Operation::KShort, 1, 1)
		.ad(Operation::GSet, 1, 0)
		.ad(Operation::GSet, 0, 1)
		.ad(Operation::Ret0, 0, 1);

	Dump::new(Version::V2_1).stripped().finish(&main)
}

/// `return <value>` for a single numeric constant.
pub fn return_number(number: Knum) -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.ad(Operation::KNum, 0, 0)
		.ad(Operation::Ret1, 0, 2)
		.number(number);

	Dump::new(Version::V2_1).stripped().finish(&main)
}

/// `local x = a < b and c or d`, with the value tested in place by `IST`.
fn and_or_test() -> Proto {
	Proto::main(Version::V2_1)
		.frame(3)
		.string("a")
		.string("b")
		.string("c")
		.string("d")
		.ad(Operation::GGet, 1, 0)
		.ad(Operation::GGet, 2, 1)
		.ad(Operation::IsGe, 1, 2)
		.jump(Operation::Jmp, 3, 7)
		.ad(Operation::GGet, 0, 2)
		.ad(Operation::IsT, 0, 0)
		.jump(Operation::Jmp, 1, 8)
		.ad(Operation::GGet, 0, 3)
		.ad(Operation::Ret1, 0, 2)
}

/// ```lua
/// local x = a < b and c or d
/// return x
/// ```
pub fn and_or_value() -> Vec<u8> {
	let main = and_or_test().variable("x", 9, 10);

	Dump::new(Version::V2_1).finish(&main)
}

/// `return a < b and c or d` without debug information.
pub fn and_or_value_stripped() -> Vec<u8> {
	Dump::new(Version::V2_1).stripped().finish(&and_or_test())
}

/// `return a < b and c or d`, the value copied out by `ISTC`.
pub fn and_or_copy() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(4)
		.string("a")
		.string("b")
		.string("c")
		.string("d")
		.ad(Operation::GGet, 1, 0)
		.ad(Operation::GGet, 2, 1)
		.ad(Operation::IsGe, 1, 2)
		.jump(Operation::Jmp, 4, 7)
		.ad(Operation::GGet, 3, 2)
		.ad(Operation::IsTC, 0, 3)
		.jump(Operation::Jmp, 4, 8)
		.ad(Operation::GGet, 0, 3)
		.ad(Operation::Ret1, 0, 2);

	Dump::new(Version::V2_1).stripped().finish(&main)
}

/// `f(a and b or c)`, where the `or` lands on the code after the `and`.
pub fn and_or_argument() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(3)
		.string("f")
		.string("a")
		.string("b")
		.string("c")
		.ad(Operation::GGet, 0, 0)
		.ad(Operation::GGet, 1, 1)
		.ad(Operation::IsF, 0, 1)
		.jump(Operation::Jmp, 2, 7)
		.ad(Operation::GGet, 2, 2)
		.ad(Operation::IsTC, 1, 2)
		.jump(Operation::Jmp, 2, 8)
		.ad(Operation::GGet, 1, 3)
		.abc(Operation::Call, 0, 1, 2)
		.ad(Operation::Ret0, 0, 1);

	Dump::new(Version::V2_1).stripped().finish(&main)
}

/// `local x = a or b`, or `local x = a and b` when `test` is `IsF`.
pub fn default_value(test: Operation) -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(1)
		.string("a")
		.string("b")
		.ad(Operation::GGet, 0, 0)
		.ad(test, 0, 0)
		.jump(Operation::Jmp, 1, 4)
		.ad(Operation::GGet, 0, 1)
		.ad(Operation::Ret1, 0, 2)
		.variable("x", 5, 6);

	Dump::new(Version::V2_1).finish(&main)
}

/// ```lua
/// for k, v in pairs(t) do
/// 	f(k, v)
/// end
/// ```
fn pairs_loop() -> Proto {
	Proto::main(Version::V2_1)
		.frame(8)
		.string("pairs")
		.string("t")
		.string("f")
		.ad(Operation::GGet, 0, 0)
		.ad(Operation::GGet, 1, 1)
		.abc(Operation::Call, 0, 4, 2)
		.jump(Operation::Jmp, 3, 8)
		.ad(Operation::GGet, 5, 2)
		.ad(Operation::Mov, 6, 3)
		.ad(Operation::Mov, 7, 4)
		.abc(Operation::Call, 5, 1, 3)
		.abc(Operation::IterC, 3, 3, 3)
		.jump(Operation::IterL, 3, 4)
		.ad(Operation::Ret0, 0, 1)
}

pub fn generic_for() -> Vec<u8> {
	let main = pairs_loop()
		.internal(4, 4, 11)
		.internal(5, 4, 11)
		.internal(6, 4, 11)
		.variable("k", 5, 10)
		.variable("v", 5, 10);

	Dump::new(Version::V2_1).finish(&main)
}

pub fn generic_for_stripped() -> Vec<u8> {
	Dump::new(Version::V2_1).stripped().finish(&pairs_loop())
}

/// ```lua
/// local i = 0
/// repeat
/// 	i = i + 1
/// until i >= 10
/// return i
/// ```
pub fn repeat_until() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(2)
		.ad(Operation::KShort, 0, 0)
		.jump(Operation::Loop, 1, 6)
		.abc(Operation::AddVN, 0, 0, 0)
		.ad(Operation::KShort, 1, 10)
		.ad(Operation::IsLt, 0, 1)
		.jump(Operation::Jmp, 1, 1)
		.ad(Operation::Ret1, 0, 2)
		.number(Knum::Integer(1))
		.variable("i", 2, 8);

	Dump::new(Version::V2_1).finish(&main)
}

/// ```lua
/// local o = g
/// o:m(1)
/// ```
pub fn method_call() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(4)
		.string("g")
		.string("m")
		.ad(Operation::GGet, 0, 0)
		.abc(Operation::TGetS, 1, 0, 1)
		.ad(Operation::Mov, 2, 0)
		.ad(Operation::KShort, 3, 1)
		.abc(Operation::Call, 1, 1, 3)
		.ad(Operation::Ret0, 0, 1)
		.variable("o", 2, 7);

	Dump::new(Version::V2_1).finish(&main)
}

/// ```lua
/// local t = { x = 1 }
/// return t
/// ```
pub fn table_fields() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(2)
		.string("x")
		.ad(Operation::TNew, 0, 0)
		.ad(Operation::KShort, 1, 1)
		.abc(Operation::TSetS, 1, 0, 0)
		.ad(Operation::Ret1, 0, 2)
		.variable("t", 2, 5);

	Dump::new(Version::V2_1).finish(&main)
}

/// `return a .. b .. c`
pub fn concat() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(3)
		.string("a")
		.string("b")
		.string("c")
		.ad(Operation::GGet, 0, 0)
		.ad(Operation::GGet, 1, 1)
		.ad(Operation::GGet, 2, 2)
		.abc(Operation::Cat, 0, 0, 2)
		.ad(Operation::Ret1, 0, 2);

	Dump::new(Version::V2_1).stripped().finish(&main)
}

/// ```lua
/// if a then
/// 	f(1)
/// elseif b then
/// 	f(2)
/// else
/// 	f(3)
/// end
/// ```
pub fn else_if() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(2)
		.string("a")
		.string("f")
		.string("b")
		.ad(Operation::GGet, 0, 0)
		.ad(Operation::IsF, 0, 0)
		.jump(Operation::Jmp, 0, 7)
		.ad(Operation::GGet, 0, 1)
		.ad(Operation::KShort, 1, 1)
		.abc(Operation::Call, 0, 1, 2)
		.jump(Operation::Jmp, 0, 17)
		.ad(Operation::GGet, 0, 2)
		.ad(Operation::IsF, 0, 0)
		.jump(Operation::Jmp, 0, 14)
		.ad(Operation::GGet, 0, 1)
		.ad(Operation::KShort, 1, 2)
		.abc(Operation::Call, 0, 1, 2)
		.jump(Operation::Jmp, 0, 17)
		.ad(Operation::GGet, 0, 1)
		.ad(Operation::KShort, 1, 3)
		.abc(Operation::Call, 0, 1, 2)
		.ad(Operation::Ret0, 0, 1);

	Dump::new(Version::V2_1).stripped().finish(&main)
}

/// ```lua
/// local x, y = f()
/// return x, y
/// ```
pub fn multiple_results() -> Vec<u8> {
	let main = Proto::main(Version::V2_1)
		.frame(2)
		.string("f")
		.ad(Operation::GGet, 0, 0)
		.abc(Operation::Call, 0, 3, 1)
		.ad(Operation::Ret, 0, 3)
		.variable("x", 3, 4)
		.variable("y", 3, 4);

	Dump::new(Version::V2_1).finish(&main)
}
