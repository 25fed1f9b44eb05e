//! The validation domain shared by the integration tests.
//!
//! It declares one namespace per area of the bridge (primitive limits, properties,
//! namespaces, exceptions, constructors, methods, structs, enums, fields, interfaces and
//! arrays) with small managed bodies whose results the tests check through the flat
//! symbol surface.

#![allow(dead_code)]

use std::sync::Arc;

use dotbridge::{prelude::*, runtime::HeapObject};

pub fn int() -> TypeDescriptor {
    PrimitiveKind::Int32.into()
}

pub fn boolean() -> TypeDescriptor {
    PrimitiveKind::Boolean.into()
}

fn single() -> TypeDescriptor {
    PrimitiveKind::Single.into()
}

fn string() -> TypeDescriptor {
    TypeDescriptor::String
}

fn this(frame: &CallFrame) -> ManagedValue {
    frame.this.clone().unwrap_or(ManagedValue::Null)
}

fn returns(
    value: ManagedValue,
) -> impl Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static {
    move |_, _| Ok(value.clone())
}

fn echo(_: &Domain, frame: &mut CallFrame) -> Result<ManagedValue> {
    Ok(frame.arg(0)?.clone())
}

fn read_field(
    name: &'static str,
) -> impl Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static {
    move |domain, frame| domain.get_field(&this(frame), name)
}

fn write_field(
    name: &'static str,
) -> impl Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static {
    move |domain, frame| {
        let value = frame.arg(0)?.clone();
        match frame.this.as_mut() {
            Some(this) => domain.set_field(this, name, value)?,
            None => {
                return Err(ManagedException::new(exception::NULL_REFERENCE, "no instance").into())
            }
        }
        Ok(ManagedValue::Void)
    }
}

fn throws(
    message: &'static str,
) -> impl Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static {
    move |_, _| Err(ManagedException::new(exception::EXCEPTION, message).into())
}

fn limits(kind: PrimitiveKind, min: ManagedValue, max: ManagedValue) -> ClassBuilder {
    ClassBuilder::static_class(&format!("Type.{kind}"))
        .static_getter("Min", kind.into(), returns(min))
        .static_getter("Max", kind.into(), returns(max))
}

fn register_types(domain: &Domain) -> Result<()> {
    domain.register(
        limits(PrimitiveKind::Char, ManagedValue::Char(0), ManagedValue::Char(u16::MAX))
            .static_getter("Zero", PrimitiveKind::Char.into(), returns(ManagedValue::Char(0)))
            .build(),
    )?;
    let ranges = [
        (PrimitiveKind::SByte, ManagedValue::I1(i8::MIN), ManagedValue::I1(i8::MAX)),
        (PrimitiveKind::Byte, ManagedValue::U1(u8::MIN), ManagedValue::U1(u8::MAX)),
        (PrimitiveKind::Int16, ManagedValue::I2(i16::MIN), ManagedValue::I2(i16::MAX)),
        (PrimitiveKind::UInt16, ManagedValue::U2(u16::MIN), ManagedValue::U2(u16::MAX)),
        (PrimitiveKind::Int32, ManagedValue::I4(i32::MIN), ManagedValue::I4(i32::MAX)),
        (PrimitiveKind::UInt32, ManagedValue::U4(u32::MIN), ManagedValue::U4(u32::MAX)),
        (PrimitiveKind::Int64, ManagedValue::I8(i64::MIN), ManagedValue::I8(i64::MAX)),
        (PrimitiveKind::UInt64, ManagedValue::U8(u64::MIN), ManagedValue::U8(u64::MAX)),
        (PrimitiveKind::Single, ManagedValue::R4(f32::MIN), ManagedValue::R4(f32::MAX)),
        (PrimitiveKind::Double, ManagedValue::R8(f64::MIN), ManagedValue::R8(f64::MAX)),
    ];
    for (kind, min, max) in ranges {
        domain.register(limits(kind, min, max).build())?;
    }

    domain.register(
        ClassBuilder::static_class("Type.String")
            .static_getter("NullString", string(), returns(ManagedValue::Null))
            .static_getter("EmptyString", string(), returns(ManagedValue::string("")))
            .static_getter("NonEmptyString", string(), returns(ManagedValue::string("Hello World")))
            .build(),
    )?;

    let scalars = [
        ("Bool", PrimitiveKind::Boolean, ManagedValue::Boolean(true)),
        ("SByte", PrimitiveKind::SByte, ManagedValue::I1(-5)),
        ("Byte", PrimitiveKind::Byte, ManagedValue::U1(5)),
        ("Short", PrimitiveKind::Int16, ManagedValue::I2(-5)),
        ("UShort", PrimitiveKind::UInt16, ManagedValue::U2(5)),
        ("Int", PrimitiveKind::Int32, ManagedValue::I4(-5)),
        ("UInt", PrimitiveKind::UInt32, ManagedValue::U4(5)),
        ("Long", PrimitiveKind::Int64, ManagedValue::I8(-5)),
        ("ULong", PrimitiveKind::UInt64, ManagedValue::U8(5)),
        ("Char", PrimitiveKind::Char, ManagedValue::Char(u16::from(b'a'))),
    ];
    let mut builtins = ClassBuilder::class("BuiltinTypes").method(
        "ReturnsVoid",
        vec![],
        TypeDescriptor::Void,
        returns(ManagedValue::Void),
    );
    for (suffix, kind, value) in &scalars {
        builtins = builtins.method(
            &format!("Returns{suffix}"),
            vec![],
            (*kind).into(),
            returns(value.clone()),
        );
    }
    builtins = builtins.method(
        "ReturnsString",
        vec![],
        string(),
        returns(ManagedValue::string("Mono")),
    );
    for (suffix, kind, _) in scalars {
        builtins = builtins.method(
            &format!("PassAndReturns{suffix}"),
            vec![ParamDescriptor::input("value", kind.into())],
            kind.into(),
            echo,
        );
    }
    builtins = builtins
        .method(
            "PassAndReturnsString",
            vec![ParamDescriptor::input("value", string())],
            string(),
            echo,
        )
        .method(
            "PassOutInt",
            vec![ParamDescriptor::output("value", int())],
            TypeDescriptor::Void,
            |_, frame| {
                frame.set_arg(0, 5)?;
                Ok(ManagedValue::Void)
            },
        )
        .method(
            "PassRefInt",
            vec![ParamDescriptor::reference("value", int())],
            TypeDescriptor::Void,
            |_, frame| {
                let value = frame.arg_i32(0)?;
                frame.set_arg(0, value + 10)?;
                Ok(ManagedValue::Void)
            },
        )
        .method(
            "PassOutString",
            vec![ParamDescriptor::output("value", string())],
            TypeDescriptor::Void,
            |_, frame| {
                frame.set_arg(0, "Mono")?;
                Ok(ManagedValue::Void)
            },
        )
        .method(
            "PassRefString",
            vec![ParamDescriptor::reference("value", string())],
            TypeDescriptor::Void,
            |_, frame| {
                frame.set_arg(0, "Mono")?;
                Ok(ManagedValue::Void)
            },
        )
        .method(
            "PassOutEmptyString",
            vec![ParamDescriptor::output("value", string())],
            TypeDescriptor::Void,
            |_, frame| {
                frame.set_arg(0, "")?;
                Ok(ManagedValue::Void)
            },
        )
        .method(
            "PassRefTrimmedString",
            vec![ParamDescriptor::reference("value", string())],
            TypeDescriptor::Void,
            |_, frame| {
                let trimmed = frame.arg_str(0)?.map(|s| s.trim().to_string());
                frame.set_arg(0, trimmed.map_or(ManagedValue::Null, ManagedValue::from))?;
                Ok(ManagedValue::Void)
            },
        );
    domain.register(builtins.build())?;
    Ok(())
}

fn register_properties(domain: &Domain) -> Result<()> {
    domain.register(
        ClassBuilder::static_class("Platform")
            .field(FieldDef::shared("exitCode", int()))
            .static_getter("IsWindows", boolean(), returns(ManagedValue::Boolean(false)))
            .static_getter("ExitCode", int(), |domain, _| domain.get_static("Platform", "exitCode"))
            .static_setter("ExitCode", int(), |domain, frame| {
                domain.set_static("Platform", "exitCode", frame.arg(0)?.clone())?;
                Ok(ManagedValue::Void)
            })
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Properties.Query")
            .field(FieldDef::instance("answer", int()).with_init(42))
            .field(FieldDef::instance("secret", int()))
            .static_getter("UniversalAnswer", int(), returns(ManagedValue::I4(42)))
            .getter("IsGood", boolean(), returns(ManagedValue::Boolean(true)))
            .getter("IsBad", boolean(), returns(ManagedValue::Boolean(false)))
            .getter("Answer", int(), read_field("answer"))
            .setter("Answer", int(), write_field("answer"))
            .getter("IsSecret", boolean(), |domain, frame| {
                let secret = domain.get_field(&this(frame), "secret")?;
                Ok(ManagedValue::Boolean(secret.as_i32().unwrap_or(0) != 0))
            })
            .setter("Secret", int(), write_field("secret"))
            .build(),
    )?;
    Ok(())
}

fn register_namespaces(domain: &Domain) -> Result<()> {
    for name in [
        "ClassWithoutNamespace",
        "First.ClassWithSingleNamespace",
        "First.Second.ClassWithNestedNamespace",
        "First.Second.Third.ClassWithNestedNamespace",
    ] {
        domain.register(
            ClassBuilder::class(name)
                .method("ToString", vec![], string(), returns(ManagedValue::string(name)))
                .build(),
        )?;
    }
    Ok(())
}

fn register_exceptions(domain: &Domain) -> Result<()> {
    domain.register(
        ClassBuilder::class("Exceptions.Throwers")
            .constructor(vec![], throws("Throwers always throw"))
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Exceptions.ThrowInStaticCtor")
            .static_init(throws("static constructor failed"))
            .constructor(vec![], returns(ManagedValue::Void))
            .static_getter("Alive", boolean(), returns(ManagedValue::Boolean(true)))
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Exceptions.Base")
            .constructor(vec![ParamDescriptor::input("thrown", boolean())], |_, frame| {
                if frame.arg_bool(0)? {
                    let ex = ManagedException::new(exception::INVALID_OPERATION, "base ctor");
                    return Err(ex.into());
                }
                Ok(ManagedValue::Void)
            })
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Exceptions.Super")
            .base("Exceptions.Base")
            .constructor(vec![ParamDescriptor::input("thrown", boolean())], |domain, frame| {
                let thrown = frame.arg(0)?.clone();
                domain.call_base_constructor("Exceptions.Super", &this(frame), vec![thrown])?;
                Ok(ManagedValue::Void)
            })
            .build(),
    )?;
    Ok(())
}

fn register_constructors(domain: &Domain) -> Result<()> {
    domain.register(
        ClassBuilder::class("Constructors.Unique")
            .field(FieldDef::instance("id", int()))
            .constructor(vec![], |domain, frame| {
                domain.set_field(&mut this(frame), "id", ManagedValue::I4(1))?;
                Ok(ManagedValue::Void)
            })
            .constructor(vec![ParamDescriptor::input("id", int())], |domain, frame| {
                let id = frame.arg(0)?.clone();
                domain.set_field(&mut this(frame), "id", id)?;
                Ok(ManagedValue::Void)
            })
            .getter("Id", int(), read_field("id"))
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Constructors.SuperUnique")
            .base("Constructors.Unique")
            .constructor(vec![], |domain, frame| {
                domain.call_base_constructor(
                    "Constructors.SuperUnique",
                    &this(frame),
                    vec![ManagedValue::I4(411)],
                )?;
                Ok(ManagedValue::Void)
            })
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Constructors.Implicit")
            .field(FieldDef::instance("testResult", string()).with_init("OK"))
            .getter("TestResult", string(), read_field("testResult"))
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Constructors.AllTypeCode")
            .field(FieldDef::instance("testResult", boolean()))
            .constructor(
                vec![
                    ParamDescriptor::input("b", boolean()),
                    ParamDescriptor::input("c", PrimitiveKind::Char.into()),
                    ParamDescriptor::input("s", string()),
                ],
                |domain, frame| {
                    let ok = frame.arg_bool(0)?
                        && frame.arg(1)? == &ManagedValue::Char(u16::MAX)
                        && frame.arg_str(2)? == Some("Mono");
                    domain.set_field(&mut this(frame), "testResult", ManagedValue::Boolean(ok))?;
                    Ok(ManagedValue::Void)
                },
            )
            .constructor(
                vec![
                    ParamDescriptor::input("i8", PrimitiveKind::SByte.into()),
                    ParamDescriptor::input("i16", PrimitiveKind::Int16.into()),
                    ParamDescriptor::input("i32", PrimitiveKind::Int32.into()),
                    ParamDescriptor::input("i64", PrimitiveKind::Int64.into()),
                ],
                |domain, frame| {
                    let ok = frame.args
                        == [
                            ManagedValue::I1(i8::MAX),
                            ManagedValue::I2(i16::MAX),
                            ManagedValue::I4(i32::MAX),
                            ManagedValue::I8(i64::MAX),
                        ];
                    domain.set_field(&mut this(frame), "testResult", ManagedValue::Boolean(ok))?;
                    Ok(ManagedValue::Void)
                },
            )
            .constructor(
                vec![
                    ParamDescriptor::input("u8", PrimitiveKind::Byte.into()),
                    ParamDescriptor::input("u16", PrimitiveKind::UInt16.into()),
                    ParamDescriptor::input("u32", PrimitiveKind::UInt32.into()),
                    ParamDescriptor::input("u64", PrimitiveKind::UInt64.into()),
                ],
                |domain, frame| {
                    let ok = frame.args
                        == [
                            ManagedValue::U1(u8::MAX),
                            ManagedValue::U2(u16::MAX),
                            ManagedValue::U4(u32::MAX),
                            ManagedValue::U8(u64::MAX),
                        ];
                    domain.set_field(&mut this(frame), "testResult", ManagedValue::Boolean(ok))?;
                    Ok(ManagedValue::Void)
                },
            )
            .constructor(
                vec![
                    ParamDescriptor::input("f32", single()),
                    ParamDescriptor::input("f64", PrimitiveKind::Double.into()),
                ],
                |domain, frame| {
                    let ok = frame.args == [ManagedValue::R4(f32::MAX), ManagedValue::R8(f64::MAX)];
                    domain.set_field(&mut this(frame), "testResult", ManagedValue::Boolean(ok))?;
                    Ok(ManagedValue::Void)
                },
            )
            .getter("TestResult", boolean(), read_field("testResult"))
            .build(),
    )?;
    Ok(())
}

fn register_methods(domain: &Domain) -> Result<()> {
    domain.register(
        ClassBuilder::class("Methods.Static")
            .field(FieldDef::instance("id", int()))
            .constructor(vec![ParamDescriptor::input("id", int())], |domain, frame| {
                let id = frame.arg(0)?.clone();
                domain.set_field(&mut this(frame), "id", id)?;
                Ok(ManagedValue::Void)
            })
            .static_method(
                "Create",
                vec![ParamDescriptor::input("id", int())],
                TypeDescriptor::object("Methods.Static"),
                |domain, frame| domain.new_object("Methods.Static", vec![frame.arg(0)?.clone()]),
            )
            .getter("Id", int(), read_field("id"))
            .build(),
    )?;

    domain.register(
        ClassBuilder::static_class("Methods.Parameters")
            .static_method(
                "Concat",
                vec![
                    ParamDescriptor::input("first", string()),
                    ParamDescriptor::input("second", string()),
                ],
                string(),
                |_, frame| {
                    Ok(match (frame.arg_str(0)?, frame.arg_str(1)?) {
                        (None, None) => ManagedValue::Null,
                        (first, second) => ManagedValue::from(format!(
                            "{}{}",
                            first.unwrap_or(""),
                            second.unwrap_or("")
                        )),
                    })
                },
            )
            .static_method(
                "Ref",
                vec![
                    ParamDescriptor::reference("b", boolean()),
                    ParamDescriptor::reference("s", string()),
                ],
                TypeDescriptor::Void,
                |_, frame| {
                    let flipped = !frame.arg_bool(0)?;
                    frame.set_arg(0, flipped)?;
                    frame.set_arg(
                        1,
                        if flipped { ManagedValue::Null } else { ManagedValue::string("hello") },
                    )?;
                    Ok(ManagedValue::Void)
                },
            )
            .static_method(
                "Out",
                vec![
                    ParamDescriptor::input("s", string()),
                    ParamDescriptor::output("length", int()),
                    ParamDescriptor::output("upper", string()),
                ],
                TypeDescriptor::Void,
                |_, frame| {
                    let (length, upper) = match frame.arg_str(0)? {
                        Some(s) => (
                            i32::try_from(s.len()).unwrap_or(i32::MAX),
                            ManagedValue::from(s.to_uppercase()),
                        ),
                        None => (0, ManagedValue::Null),
                    };
                    frame.set_arg(1, length)?;
                    frame.set_arg(2, upper)?;
                    Ok(ManagedValue::Void)
                },
            )
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Methods.Item")
            .field(FieldDef::instance("integer", int()))
            .constructor(vec![ParamDescriptor::input("integer", int())], |domain, frame| {
                let value = frame.arg(0)?.clone();
                domain.set_field(&mut this(frame), "integer", value)?;
                Ok(ManagedValue::Void)
            })
            .getter("Integer", int(), read_field("integer"))
            .build(),
    )?;

    domain.register(
        ClassBuilder::static_class("Methods.Factory")
            .static_method(
                "CreateItem",
                vec![ParamDescriptor::input("id", int())],
                TypeDescriptor::object("Methods.Item"),
                |domain, frame| domain.new_object("Methods.Item", vec![frame.arg(0)?.clone()]),
            )
            .build(),
    )?;

    domain.register(
        ClassBuilder::class("Methods.Collection")
            .sequence_of(TypeDescriptor::object("Methods.Item"))
            .build(),
    )?;
    Ok(())
}

pub fn point(x: f32, y: f32) -> ManagedValue {
    ManagedValue::Struct(StructValue::new(
        Arc::from("Structs.Point"),
        vec![ManagedValue::R4(x), ManagedValue::R4(y)],
    ))
}

fn coordinates(value: &ManagedValue) -> Result<(f32, f32)> {
    let fields = value.as_struct().map(StructValue::fields).unwrap_or_default();
    match fields {
        [ManagedValue::R4(x), ManagedValue::R4(y)] => Ok((*x, *y)),
        _ => Err(Error::TypeMismatch {
            expected: "Structs.Point".to_string(),
            found: value.describe(),
        }),
    }
}

fn pair(frame: &CallFrame) -> Result<((f32, f32), (f32, f32))> {
    Ok((coordinates(frame.arg(0)?)?, coordinates(frame.arg(1)?)?))
}

fn register_structs(domain: &Domain) -> Result<()> {
    let layout = Arc::new(
        StructDescriptor::new("Structs.Point")
            .field("X", single())
            .field("Y", single()),
    );
    let ty = TypeDescriptor::Struct(layout.clone());
    let operands = || {
        vec![
            ParamDescriptor::input("left", TypeDescriptor::Struct(layout.clone())),
            ParamDescriptor::input("right", TypeDescriptor::Struct(layout.clone())),
        ]
    };

    domain.register(
        ClassBuilder::structure(layout.clone())
            .constructor(
                vec![ParamDescriptor::input("x", single()), ParamDescriptor::input("y", single())],
                |_, frame| {
                    let (x, y) = (frame.arg(0)?.clone(), frame.arg(1)?.clone());
                    let this = frame.this_struct()?;
                    this.set_field(0, x);
                    this.set_field(1, y);
                    Ok(ManagedValue::Void)
                },
            )
            .getter("X", single(), read_field("X"))
            .getter("Y", single(), read_field("Y"))
            .static_getter("Zero", ty.clone(), returns(point(0.0, 0.0)))
            .operator(OperatorKind::Equality, operands(), boolean(), |_, frame| {
                let (a, b) = pair(frame)?;
                Ok(ManagedValue::Boolean(a == b))
            })
            .operator(OperatorKind::Inequality, operands(), boolean(), |_, frame| {
                let (a, b) = pair(frame)?;
                Ok(ManagedValue::Boolean(a != b))
            })
            .operator(OperatorKind::Addition, operands(), ty.clone(), |_, frame| {
                let ((ax, ay), (bx, by)) = pair(frame)?;
                Ok(point(ax + bx, ay + by))
            })
            .operator(OperatorKind::Subtraction, operands(), ty, |_, frame| {
                let ((ax, ay), (bx, by)) = pair(frame)?;
                Ok(point(ax - bx, ay - by))
            })
            .build(),
    )?;
    Ok(())
}

fn register_enums(domain: &Domain) -> Result<()> {
    let byte_enum = Arc::new(
        EnumDescriptor::new("Enums.ByteEnum", PrimitiveKind::Byte, false)?
            .member("Zero", 0)
            .member("Max", i64::from(u8::MAX)),
    );
    let short_enum = Arc::new(
        EnumDescriptor::new("Enums.ShortEnum", PrimitiveKind::Int16, false)?
            .member("Min", i64::from(i16::MIN))
            .member("Max", i64::from(i16::MAX)),
    );
    let int_enum = Arc::new(
        EnumDescriptor::new("Enums.IntEnum", PrimitiveKind::Int32, false)?
            .member("Min", i64::from(i32::MIN))
            .member("Max", i64::from(i32::MAX)),
    );
    let flags = Arc::new(
        EnumDescriptor::new("Enums.ByteFlags", PrimitiveKind::Byte, true)?
            .member("None", 0)
            .member("FlagA", 0x02)
            .member("FlagB", 0x20),
    );

    for desc in [&byte_enum, &short_enum, &int_enum, &flags] {
        domain.register(ClassBuilder::enumeration(desc.clone()).build())?;
    }

    let combined = flags.clone();
    domain.register(
        ClassBuilder::static_class("Enums.Enumer")
            .static_method(
                "Test",
                vec![
                    ParamDescriptor::input("b", TypeDescriptor::Enum(byte_enum.clone())),
                    ParamDescriptor::output("i", TypeDescriptor::Enum(int_enum)),
                    ParamDescriptor::output("s", TypeDescriptor::Enum(short_enum)),
                ],
                TypeDescriptor::Enum(flags),
                move |_, frame| {
                    let max = frame.arg(0)?.to_bits() == byte_enum.value_of("Max");
                    if max {
                        frame.set_arg(1, i32::MAX)?;
                        frame.set_arg(2, i16::MAX)?;
                    } else {
                        frame.set_arg(1, i32::MIN)?;
                        frame.set_arg(2, i16::MIN)?;
                    }
                    let bits = combined.combine(&[
                        combined.value_of("FlagB").unwrap_or(0),
                        combined.value_of("FlagA").unwrap_or(0),
                    ]);
                    Ok(combined.to_managed(bits))
                },
            )
            .build(),
    )?;
    Ok(())
}

fn register_fields(domain: &Domain) -> Result<()> {
    let layout = Arc::new(
        StructDescriptor::new("Fields.Struct")
            .field("Boolean", boolean())
            .field("Class", TypeDescriptor::object("Fields.Class")),
    );
    let structure = TypeDescriptor::Struct(layout.clone());

    domain.register(
        ClassBuilder::class("Fields.Class")
            .field(
                FieldDef::shared("MaxLong", PrimitiveKind::Int64.into())
                    .with_init(i64::MAX)
                    .readonly()
                    .public(),
            )
            .field(FieldDef::shared("Integer", int()).public())
            .field(FieldDef::shared("Scratch", TypeDescriptor::object("Fields.Class")).public())
            .field(FieldDef::instance("Boolean", boolean()).public())
            .field(FieldDef::instance("Structure", structure.clone()).public())
            .static_init(|domain, _| {
                let scratch = domain.new_object("Fields.Class", vec![ManagedValue::Boolean(true)])?;
                domain.set_static("Fields.Class", "Scratch", scratch)?;
                Ok(ManagedValue::Void)
            })
            .constructor(vec![ParamDescriptor::input("enabled", boolean())], |domain, frame| {
                let enabled = frame.arg(0)?.clone();
                domain.set_field(&mut this(frame), "Boolean", enabled)?;
                Ok(ManagedValue::Void)
            })
            .build(),
    )?;

    domain.register(
        ClassBuilder::structure(layout)
            .expose("Boolean")
            .expose("Class")
            .field(FieldDef::shared("Integer", int()).public())
            .field(FieldDef::shared("Scratch", structure.clone()).public())
            .field(FieldDef::shared("Empty", structure).readonly().public())
            .constructor(vec![ParamDescriptor::input("enabled", boolean())], |domain, frame| {
                let enabled = frame.arg(0)?.clone();
                let class = domain.new_object("Fields.Class", vec![ManagedValue::Boolean(false)])?;
                let this = frame.this_struct()?;
                this.set_field(0, enabled);
                this.set_field(1, class);
                Ok(ManagedValue::Void)
            })
            .build(),
    )?;
    Ok(())
}

fn register_interfaces(domain: &Domain) -> Result<()> {
    let long: TypeDescriptor = PrimitiveKind::Int64.into();

    domain.register(
        ClassBuilder::interface("Interfaces.IMakeItUp")
            .abstract_getter("Boolean", boolean())
            .abstract_method("Convert", vec![ParamDescriptor::input("value", int())], string())
            .abstract_method(
                "Convert",
                vec![ParamDescriptor::input("value", long.clone())],
                string(),
            )
            .build(),
    )?;

    let convert = |_: &Domain, frame: &mut CallFrame| -> Result<ManagedValue> {
        let value = frame.arg_i64(0)?;
        Ok(ManagedValue::from(value.to_string()))
    };
    domain.register(
        ClassBuilder::class("Interfaces.MakeItUp")
            .implements("Interfaces.IMakeItUp")
            .field(FieldDef::instance("state", boolean()))
            .getter("Boolean", boolean(), |domain, frame| {
                let mut this = this(frame);
                let state = !domain.get_field(&this, "state")?.as_bool().unwrap_or(false);
                domain.set_field(&mut this, "state", ManagedValue::Boolean(state))?;
                Ok(ManagedValue::Boolean(state))
            })
            .method("Convert", vec![ParamDescriptor::input("value", int())], string(), convert)
            .method("Convert", vec![ParamDescriptor::input("value", long)], string(), convert)
            .build(),
    )?;

    domain.register(
        ClassBuilder::static_class("Interfaces.Supplier")
            .static_method(
                "Create",
                vec![],
                TypeDescriptor::object("Interfaces.IMakeItUp"),
                |domain, _| domain.new_object("Interfaces.MakeItUp", vec![]),
            )
            .build(),
    )?;

    let operands = || vec![ParamDescriptor::input("a", int()), ParamDescriptor::input("b", int())];
    domain.register(
        ClassBuilder::interface("Interfaces.IOperations")
            .abstract_method("Addition", operands(), int())
            .build(),
    )?;
    domain.register(
        ClassBuilder::class("Interfaces.ManagedAdder")
            .implements("Interfaces.IOperations")
            .method("Addition", operands(), int(), |_, frame| {
                Ok(ManagedValue::I4(frame.arg_i32(0)?.wrapping_add(frame.arg_i32(1)?)))
            })
            .build(),
    )?;
    domain.register(
        ClassBuilder::static_class("Interfaces.OpConsumer")
            .static_method(
                "DoAddition",
                vec![
                    ParamDescriptor::input("ops", TypeDescriptor::object("Interfaces.IOperations")),
                    ParamDescriptor::input("a", int()),
                    ParamDescriptor::input("b", int()),
                ],
                int(),
                |domain, frame| {
                    let ops = frame.arg(0)?.clone();
                    domain.call(&ops, "Addition", frame.args[1..].to_vec())
                },
            )
            .static_method("TestManagedAdder", operands(), boolean(), |domain, frame| {
                let (a, b) = (frame.arg_i32(0)?, frame.arg_i32(1)?);
                let adder = domain.new_object("Interfaces.ManagedAdder", vec![])?;
                let sum = domain.call(&adder, "Addition", frame.args.clone())?;
                Ok(ManagedValue::Boolean(sum == ManagedValue::I4(a.wrapping_add(b))))
            })
            .build(),
    )?;
    Ok(())
}

fn register_arrays(domain: &Domain) -> Result<()> {
    domain.register(
        ClassBuilder::static_class("Arrays.ArrayTypes")
            .static_method(
                "SumByteArray",
                vec![ParamDescriptor::input(
                    "array",
                    TypeDescriptor::array(PrimitiveKind::Byte.into()),
                )],
                int(),
                |domain, frame| {
                    let Some(array) = frame.arg(0)?.as_object() else {
                        let ex = ManagedException::new(exception::NULL_REFERENCE, "array is null");
                        return Err(ex.into());
                    };
                    let sum = domain.heap().with(array, |object| match object {
                        HeapObject::Array { elements, .. } => {
                            elements.iter().filter_map(ManagedValue::as_i64).sum::<i64>()
                        }
                        _ => 0,
                    })?;
                    Ok(ManagedValue::I4(i32::try_from(sum).unwrap_or(i32::MAX)))
                },
            )
            .static_method("ReturnsIntArray", vec![], TypeDescriptor::array(int()), |domain, _| {
                domain.new_array(int(), (1..=3).map(ManagedValue::I4).collect())
            })
            .static_method(
                "ReturnsStringArray",
                vec![],
                TypeDescriptor::array(string()),
                |domain, _| {
                    let items = ["1", "2", "3"].into_iter().map(ManagedValue::string).collect();
                    domain.new_array(string(), items)
                },
            )
            .build(),
    )?;
    Ok(())
}

/// Builds the complete validation domain.
pub fn validation_domain() -> Result<Domain> {
    let domain = Domain::new();
    register_types(&domain)?;
    register_properties(&domain)?;
    register_namespaces(&domain)?;
    register_exceptions(&domain)?;
    register_constructors(&domain)?;
    register_methods(&domain)?;
    register_structs(&domain)?;
    register_enums(&domain)?;
    register_fields(&domain)?;
    register_interfaces(&domain)?;
    register_arrays(&domain)?;
    Ok(domain)
}

/// A bridge over the validation domain with its own fault state.
pub fn bridge() -> Result<Bridge> {
    Ok(
        Bridge::with_config(Arc::new(validation_domain()?), BridgeConfig::minimal())?
            .with_exception_state(Arc::new(ExceptionState::new())),
    )
}

/// The handle carried by an entry point result.
pub fn handle(value: &NativeValue) -> ManagedHandle {
    value.as_handle().unwrap_or(ManagedHandle::NULL)
}
