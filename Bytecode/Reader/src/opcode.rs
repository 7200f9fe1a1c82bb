use core::fmt::{Display, Formatter, Result};

/// The LuaJIT release whose bytecode dialect is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
	V2_0,
	V2_1,
}

impl Version {
	#[must_use]
	pub const fn from_format(format: u8) -> Option<Self> {
		match format {
			1 => Some(Self::V2_0),
			2 => Some(Self::V2_1),
			_ => None,
		}
	}

	#[must_use]
	pub const fn format(self) -> u8 {
		match self {
			Self::V2_0 => 1,
			Self::V2_1 => 2,
		}
	}

	/// Peeks at the header of a dump without parsing it.
	#[must_use]
	pub fn detect(data: &[u8]) -> Option<Self> {
		match data {
			[0x1B, b'L', b'J', format, ..] => Self::from_format(*format),
			_ => None,
		}
	}

	#[must_use]
	pub fn from_name(name: &str) -> Option<Self> {
		match name {
			"2.0" => Some(Self::V2_0),
			"2.1" => Some(Self::V2_1),
			_ => None,
		}
	}
}

impl Display for Version {
	fn fmt(&self, f: &mut Formatter) -> Result {
		match self {
			Self::V2_0 => write!(f, "2.0"),
			Self::V2_1 => write!(f, "2.1"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	IsLt,
	IsGe,
	IsLe,
	IsGt,
	IsEqV,
	IsNeV,
	IsEqS,
	IsNeS,
	IsEqN,
	IsNeN,
	IsEqP,
	IsNeP,
	IsTC,
	IsFC,
	IsT,
	IsF,
	IsType,
	IsNum,
	Mov,
	Not,
	Unm,
	Len,
	AddVN,
	SubVN,
	MulVN,
	DivVN,
	ModVN,
	AddNV,
	SubNV,
	MulNV,
	DivNV,
	ModNV,
	AddVV,
	SubVV,
	MulVV,
	DivVV,
	ModVV,
	Pow,
	Cat,
	KStr,
	KCdata,
	KShort,
	KNum,
	KPri,
	KNil,
	UGet,
	USetV,
	USetS,
	USetN,
	USetP,
	UClo,
	FNew,
	TNew,
	TDup,
	GGet,
	GSet,
	TGetV,
	TGetS,
	TGetB,
	TGetR,
	TSetV,
	TSetS,
	TSetB,
	TSetM,
	TSetR,
	CallM,
	Call,
	CallMT,
	CallT,
	IterC,
	IterN,
	VArg,
	IsNext,
	RetM,
	Ret,
	Ret0,
	Ret1,
	ForI,
	JForI,
	ForL,
	IForL,
	JForL,
	IterL,
	IIterL,
	JIterL,
	Loop,
	ILoop,
	JLoop,
	Jmp,
	FuncF,
	IFuncF,
	JFuncF,
	FuncV,
	IFuncV,
	JFuncV,
	FuncC,
	FuncCW,
}

/// How an operand field of an instruction is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
	None,
	Destination,
	Variable,
	Base,
	Literal,
	SignedLiteral,
	Primitive,
	Number,
	String,
	Table,
	Function,
	Cdata,
	Upvalue,
	Jump,
}

/// The operand layout of an operation: `A` plus either `B`/`C` or the wide `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
	AD(Operand, Operand),
	ABC(Operand, Operand, Operand),
}

impl Operation {
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::IsLt => "ISLT",
			Self::IsGe => "ISGE",
			Self::IsLe => "ISLE",
			Self::IsGt => "ISGT",
			Self::IsEqV => "ISEQV",
			Self::IsNeV => "ISNEV",
			Self::IsEqS => "ISEQS",
			Self::IsNeS => "ISNES",
			Self::IsEqN => "ISEQN",
			Self::IsNeN => "ISNEN",
			Self::IsEqP => "ISEQP",
			Self::IsNeP => "ISNEP",
			Self::IsTC => "ISTC",
			Self::IsFC => "ISFC",
			Self::IsT => "IST",
			Self::IsF => "ISF",
			Self::IsType => "ISTYPE",
			Self::IsNum => "ISNUM",
			Self::Mov => "MOV",
			Self::Not => "NOT",
			Self::Unm => "UNM",
			Self::Len => "LEN",
			Self::AddVN => "ADDVN",
			Self::SubVN => "SUBVN",
			Self::MulVN => "MULVN",
			Self::DivVN => "DIVVN",
			Self::ModVN => "MODVN",
			Self::AddNV => "ADDNV",
			Self::SubNV => "SUBNV",
			Self::MulNV => "MULNV",
			Self::DivNV => "DIVNV",
			Self::ModNV => "MODNV",
			Self::AddVV => "ADDVV",
			Self::SubVV => "SUBVV",
			Self::MulVV => "MULVV",
			Self::DivVV => "DIVVV",
			Self::ModVV => "MODVV",
			Self::Pow => "POW",
			Self::Cat => "CAT",
			Self::KStr => "KSTR",
			Self::KCdata => "KCDATA",
			Self::KShort => "KSHORT",
			Self::KNum => "KNUM",
			Self::KPri => "KPRI",
			Self::KNil => "KNIL",
			Self::UGet => "UGET",
			Self::USetV => "USETV",
			Self::USetS => "USETS",
			Self::USetN => "USETN",
			Self::USetP => "USETP",
			Self::UClo => "UCLO",
			Self::FNew => "FNEW",
			Self::TNew => "TNEW",
			Self::TDup => "TDUP",
			Self::GGet => "GGET",
			Self::GSet => "GSET",
			Self::TGetV => "TGETV",
			Self::TGetS => "TGETS",
			Self::TGetB => "TGETB",
			Self::TGetR => "TGETR",
			Self::TSetV => "TSETV",
			Self::TSetS => "TSETS",
			Self::TSetB => "TSETB",
			Self::TSetM => "TSETM",
			Self::TSetR => "TSETR",
			Self::CallM => "CALLM",
			Self::Call => "CALL",
			Self::CallMT => "CALLMT",
			Self::CallT => "CALLT",
			Self::IterC => "ITERC",
			Self::IterN => "ITERN",
			Self::VArg => "VARG",
			Self::IsNext => "ISNEXT",
			Self::RetM => "RETM",
			Self::Ret => "RET",
			Self::Ret0 => "RET0",
			Self::Ret1 => "RET1",
			Self::ForI => "FORI",
			Self::JForI => "JFORI",
			Self::ForL => "FORL",
			Self::IForL => "IFORL",
			Self::JForL => "JFORL",
			Self::IterL => "ITERL",
			Self::IIterL => "IITERL",
			Self::JIterL => "JITERL",
			Self::Loop => "LOOP",
			Self::ILoop => "ILOOP",
			Self::JLoop => "JLOOP",
			Self::Jmp => "JMP",
			Self::FuncF => "FUNCF",
			Self::IFuncF => "IFUNCF",
			Self::JFuncF => "JFUNCF",
			Self::FuncV => "FUNCV",
			Self::IFuncV => "IFUNCV",
			Self::JFuncV => "JFUNCV",
			Self::FuncC => "FUNCC",
			Self::FuncCW => "FUNCCW",
		}
	}

	#[must_use]
	pub const fn shape(self) -> Shape {
		use Operand::{
			Base, Cdata, Destination, Function, Jump, Literal, None, Number, Primitive,
			SignedLiteral, String, Table, Upvalue, Variable,
		};

		match self {
			Self::IsLt | Self::IsGe | Self::IsLe | Self::IsGt | Self::IsEqV | Self::IsNeV => {
				Shape::AD(Variable, Variable)
			}
			Self::IsEqS | Self::IsNeS => Shape::AD(Variable, String),
			Self::IsEqN | Self::IsNeN => Shape::AD(Variable, Number),
			Self::IsEqP | Self::IsNeP => Shape::AD(Variable, Primitive),
			Self::IsTC | Self::IsFC | Self::Mov | Self::Not | Self::Unm | Self::Len => {
				Shape::AD(Destination, Variable)
			}
			Self::IsT | Self::IsF => Shape::AD(None, Variable),
			Self::IsType | Self::IsNum => Shape::AD(Variable, Literal),
			Self::AddVN
			| Self::SubVN
			| Self::MulVN
			| Self::DivVN
			| Self::ModVN
			| Self::AddNV
			| Self::SubNV
			| Self::MulNV
			| Self::DivNV
			| Self::ModNV => Shape::ABC(Destination, Variable, Number),
			Self::AddVV | Self::SubVV | Self::MulVV | Self::DivVV | Self::ModVV | Self::Pow => {
				Shape::ABC(Destination, Variable, Variable)
			}
			Self::Cat => Shape::ABC(Destination, Base, Base),
			Self::KStr | Self::GGet => Shape::AD(Destination, String),
			Self::KCdata => Shape::AD(Destination, Cdata),
			Self::KShort => Shape::AD(Destination, SignedLiteral),
			Self::KNum => Shape::AD(Destination, Number),
			Self::KPri => Shape::AD(Destination, Primitive),
			Self::KNil => Shape::AD(Base, Base),
			Self::UGet => Shape::AD(Destination, Upvalue),
			Self::USetV => Shape::AD(Upvalue, Variable),
			Self::USetS => Shape::AD(Upvalue, String),
			Self::USetN => Shape::AD(Upvalue, Number),
			Self::USetP => Shape::AD(Upvalue, Primitive),
			Self::UClo | Self::IsNext | Self::Loop | Self::ILoop | Self::Jmp => {
				Shape::AD(Base, Jump)
			}
			Self::ForI | Self::JForI | Self::ForL | Self::IForL | Self::IterL | Self::IIterL => {
				Shape::AD(Base, Jump)
			}
			Self::JForL | Self::JIterL | Self::JLoop => Shape::AD(Base, Literal),
			Self::FNew => Shape::AD(Destination, Function),
			Self::TNew => Shape::AD(Destination, Literal),
			Self::TDup => Shape::AD(Destination, Table),
			Self::GSet => Shape::AD(Variable, String),
			Self::TGetV | Self::TGetR => Shape::ABC(Destination, Variable, Variable),
			Self::TGetS => Shape::ABC(Destination, Variable, String),
			Self::TGetB => Shape::ABC(Destination, Variable, Literal),
			Self::TSetV | Self::TSetR => Shape::ABC(Variable, Variable, Variable),
			Self::TSetS => Shape::ABC(Variable, Variable, String),
			Self::TSetB => Shape::ABC(Variable, Variable, Literal),
			Self::TSetM => Shape::AD(Base, Number),
			Self::CallM | Self::Call | Self::IterC | Self::IterN | Self::VArg => {
				Shape::ABC(Base, Literal, Literal)
			}
			Self::CallMT | Self::CallT | Self::RetM | Self::Ret | Self::Ret0 | Self::Ret1 => {
				Shape::AD(Base, Literal)
			}
			Self::FuncF
			| Self::IFuncF
			| Self::JFuncF
			| Self::FuncV
			| Self::IFuncV
			| Self::JFuncV
			| Self::FuncC
			| Self::FuncCW => Shape::AD(Base, None),
		}
	}
}

const COMMON_TESTS: [Operation; 16] = [
	Operation::IsLt,
	Operation::IsGe,
	Operation::IsLe,
	Operation::IsGt,
	Operation::IsEqV,
	Operation::IsNeV,
	Operation::IsEqS,
	Operation::IsNeS,
	Operation::IsEqN,
	Operation::IsNeN,
	Operation::IsEqP,
	Operation::IsNeP,
	Operation::IsTC,
	Operation::IsFC,
	Operation::IsT,
	Operation::IsF,
];

macro_rules! table {
	($($operation:ident),* $(,)?) => {
		[$(Operation::$operation),*]
	};
}

const V2_0_REST: [Operation; 77] = table![
	Mov, Not, Unm, Len, AddVN, SubVN, MulVN, DivVN, ModVN, AddNV, SubNV, MulNV, DivNV, ModNV,
	AddVV, SubVV, MulVV, DivVV, ModVV, Pow, Cat, KStr, KCdata, KShort, KNum, KPri, KNil, UGet,
	USetV, USetS, USetN, USetP, UClo, FNew, TNew, TDup, GGet, GSet, TGetV, TGetS, TGetB, TSetV,
	TSetS, TSetB, TSetM, CallM, Call, CallMT, CallT, IterC, IterN, VArg, IsNext, RetM, Ret, Ret0,
	Ret1, ForI, JForI, ForL, IForL, JForL, IterL, IIterL, JIterL, Loop, ILoop, JLoop, Jmp, FuncF,
	IFuncF, JFuncF, FuncV, IFuncV, JFuncV, FuncC, FuncCW,
];

const V2_1_REST: [Operation; 81] = table![
	IsType, IsNum, Mov, Not, Unm, Len, AddVN, SubVN, MulVN, DivVN, ModVN, AddNV, SubNV, MulNV,
	DivNV, ModNV, AddVV, SubVV, MulVV, DivVV, ModVV, Pow, Cat, KStr, KCdata, KShort, KNum, KPri,
	KNil, UGet, USetV, USetS, USetN, USetP, UClo, FNew, TNew, TDup, GGet, GSet, TGetV, TGetS,
	TGetB, TGetR, TSetV, TSetS, TSetB, TSetM, TSetR, CallM, Call, CallMT, CallT, IterC, IterN,
	VArg, IsNext, RetM, Ret, Ret0, Ret1, ForI, JForI, ForL, IForL, JForL, IterL, IIterL, JIterL,
	Loop, ILoop, JLoop, Jmp, FuncF, IFuncF, JFuncF, FuncV, IFuncV, JFuncV, FuncC, FuncCW,
];

/// Maps operation bytes to operations for one [`Version`]. Built once per
/// pipeline and only ever read afterwards.
pub struct OpcodeTable {
	version: Version,
	rest: &'static [Operation],
}

impl OpcodeTable {
	#[must_use]
	pub const fn new(version: Version) -> Self {
		let rest: &'static [Operation] = match version {
			Version::V2_0 => &V2_0_REST,
			Version::V2_1 => &V2_1_REST,
		};

		Self { version, rest }
	}

	#[must_use]
	pub const fn version(&self) -> Version {
		self.version
	}

	#[must_use]
	pub const fn len(&self) -> usize {
		COMMON_TESTS.len() + self.rest.len()
	}

	#[must_use]
	pub const fn is_empty(&self) -> bool {
		self.len() == 0
	}

	#[must_use]
	pub fn decode(&self, opcode: u8) -> Option<Operation> {
		let opcode = usize::from(opcode);

		COMMON_TESTS
			.get(opcode)
			.or_else(|| self.rest.get(opcode - COMMON_TESTS.len()))
			.copied()
	}

	#[must_use]
	pub fn encode(&self, operation: Operation) -> Option<u8> {
		let index = COMMON_TESTS
			.iter()
			.chain(self.rest)
			.position(|&other| other == operation)?;

		u8::try_from(index).ok()
	}
}
