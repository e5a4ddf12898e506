//! Registrations installed into every fresh core: primitive codecs and
//! their aliases, the allow-list seeds for the built-in surface, string
//! proxies for big numbers, ids and type references, and the arg-array
//! codecs for the date/time types.

use std::any::TypeId;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use tracing::debug;
use uuid::Uuid;

use crate::codec::of;
use crate::codecs::array::ByteArrayCodec;
use crate::codecs::primitive::{
    BoolCodec, CharCodec, F32Codec, F64Codec, I8Codec, I16Codec, I32Codec, I64Codec,
    StringCodec, U8Codec, U16Codec, U32Codec, U64Codec,
};
use crate::codecs::string_proxy::TypeRefCodec;
use crate::core::CodecCore;
use crate::error::CodecError;
use crate::format::Format;
use crate::name;
use crate::reflect::TypeRef;

/// Identifiers every core accepts as decode targets out of the box: the
/// primitives, the collection bases, and the pre-registered proxies.
const BUILTIN_TYPES: &[&str] = &[
    "bool", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64", "char",
    "String", name::DYNAMIC, "BigInt", "BigDecimal", "Uuid", "TypeRef", "List", "Deque",
    "Set", "SortedSet", "Map", "SortedMap", "Array", "Option",
];

/// Alternate accepted spellings for the primitive identifiers.
const PRIMITIVE_ALIASES: &[(&str, &str)] = &[
    ("byte", "i8"),
    ("short", "i16"),
    ("int", "i32"),
    ("long", "i64"),
    ("float", "f32"),
    ("double", "f64"),
    ("boolean", "bool"),
    ("string", "String"),
    ("Byte", "i8"),
    ("Short", "i16"),
    ("Integer", "i32"),
    ("Long", "i64"),
    ("Float", "f32"),
    ("Double", "f64"),
    ("Boolean", "bool"),
    ("Character", "char"),
];

pub(crate) fn install<F: Format>(core: &mut CodecCore<F>) {
    debug!(format = F::NAME, "bootstrapping codec core");

    macro_rules! register_primitive {
        ($($ty:ty => $codec:expr),* $(,)?) => {
            $(
                core.registry().register(TypeId::of::<$ty>(), Arc::new($codec));
            )*
        };
    }

    register_primitive! {
        bool => BoolCodec,
        i8 => I8Codec,
        i16 => I16Codec,
        i32 => I32Codec,
        i64 => I64Codec,
        u8 => U8Codec,
        u16 => U16Codec,
        u32 => U32Codec,
        u64 => U64Codec,
        f32 => F32Codec,
        f64 => F64Codec,
        char => CharCodec,
        String => StringCodec,
        Vec<u8> => ByteArrayCodec,
    }

    core.registry()
        .register(TypeId::of::<TypeRef>(), Arc::new(TypeRefCodec));

    let config = core.config_mut();
    for (alias, canonical) in PRIMITIVE_ALIASES {
        config.add_alias(*alias, *canonical);
    }
    for id in BUILTIN_TYPES {
        config.allow_type(*id);
    }
    config.allow_namespace("time");

    core.register_string_proxy::<BigInt>(
        "BigInt",
        |v| v.to_string(),
        |s| s.parse::<BigInt>().map_err(|e| e.to_string()),
    );
    core.register_string_proxy::<BigDecimal>(
        "BigDecimal",
        |v| v.to_string(),
        |s| s.parse::<BigDecimal>().map_err(|e| e.to_string()),
    );
    core.register_string_proxy::<Uuid>(
        "Uuid",
        |v| v.to_string(),
        |s| Uuid::parse_str(s).map_err(|e| e.to_string()),
    );

    install_time(core);
}

/// The date/time surface, all arg-array constructed: these types have no
/// setters and validate their components, so decoded field values are
/// bundled and handed to the type's own constructors.
fn install_time<F: Format>(core: &mut CodecCore<F>) {
    core.arg_array::<Date>("time.Date")
        .field("year", |d| d.year(), of())
        .field("month", |d| u8::from(d.month()), of())
        .field("day", |d| d.day(), of())
        .construct(|mut args| {
            let year = args.take::<i32>(0)?;
            let month = args.take::<u8>(1)?;
            let day = args.take::<u8>(2)?;
            let month = Month::try_from(month)
                .map_err(|e| CodecError::schema("time.Date", e.to_string()))?;
            Date::from_calendar_date(year, month, day)
                .map_err(|e| CodecError::schema("time.Date", e.to_string()))
        });

    core.arg_array::<Time>("time.Time")
        .field("hour", |t| t.hour(), of())
        .field("minute", |t| t.minute(), of())
        .field("second", |t| t.second(), of())
        .field("nanosecond", |t| t.nanosecond(), of())
        .construct(|mut args| {
            let hour = args.take::<u8>(0)?;
            let minute = args.take::<u8>(1)?;
            let second = args.take::<u8>(2)?;
            let nanosecond = args.take::<u32>(3)?;
            Time::from_hms_nano(hour, minute, second, nanosecond)
                .map_err(|e| CodecError::schema("time.Time", e.to_string()))
        });

    core.arg_array::<PrimitiveDateTime>("time.DateTime")
        .field("date", |dt| dt.date(), of())
        .field("time", |dt| dt.time(), of())
        .construct(|mut args| {
            let date = args.take::<Date>(0)?;
            let time = args.take::<Time>(1)?;
            Ok(PrimitiveDateTime::new(date, time))
        });

    core.arg_array::<UtcOffset>("time.Offset")
        .field("seconds", |o| o.whole_seconds(), of())
        .construct(|mut args| {
            let seconds = args.take::<i32>(0)?;
            UtcOffset::from_whole_seconds(seconds)
                .map_err(|e| CodecError::schema("time.Offset", e.to_string()))
        });

    core.arg_array::<OffsetDateTime>("time.OffsetDateTime")
        .field(
            "datetime",
            |odt| PrimitiveDateTime::new(odt.date(), odt.time()),
            of(),
        )
        .field("offset", |odt| odt.offset(), of())
        .construct(|mut args| {
            let datetime = args.take::<PrimitiveDateTime>(0)?;
            let offset = args.take::<UtcOffset>(1)?;
            Ok(datetime.assume_offset(offset))
        });

    core.arg_array::<Duration>("time.Duration")
        .field("seconds", |d| d.whole_seconds(), of())
        .field("nanoseconds", |d| d.subsec_nanoseconds(), of())
        .construct(|mut args| {
            let seconds = args.take::<i64>(0)?;
            let nanoseconds = args.take::<i32>(1)?;
            Ok(Duration::new(seconds, nanoseconds))
        });
}
