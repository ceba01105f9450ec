//! Type converter options and their merge rules

use crate::config::Culture;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::{BitOr, BitOrAssign};

macro_rules! style_flags {
    ($name:ident { $($(#[$meta:meta])* $flag:ident = $bit:expr,)* }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u32);

        impl $name {
            pub const NONE: Self = Self(0);
            $($(#[$meta])* pub const $flag: Self = Self($bit);)*

            pub const fn bits(self) -> u32 {
                self.0
            }

            /// True if every flag in `other` is set
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }
    };
}

style_flags!(NumberStyles {
    ALLOW_LEADING_WHITE = 1 << 0,
    ALLOW_TRAILING_WHITE = 1 << 1,
    ALLOW_LEADING_SIGN = 1 << 2,
    ALLOW_TRAILING_SIGN = 1 << 3,
    ALLOW_PARENTHESES = 1 << 4,
    ALLOW_DECIMAL_POINT = 1 << 5,
    ALLOW_THOUSANDS = 1 << 6,
    ALLOW_EXPONENT = 1 << 7,
    ALLOW_CURRENCY_SYMBOL = 1 << 8,
    /// Digits are hexadecimal; an optional `0x` prefix is accepted
    ALLOW_HEX_SPECIFIER = 1 << 9,
});

impl NumberStyles {
    pub const INTEGER: Self = Self::ALLOW_LEADING_WHITE
        .union(Self::ALLOW_TRAILING_WHITE)
        .union(Self::ALLOW_LEADING_SIGN);
    pub const HEX_NUMBER: Self = Self::ALLOW_LEADING_WHITE
        .union(Self::ALLOW_TRAILING_WHITE)
        .union(Self::ALLOW_HEX_SPECIFIER);
    pub const NUMBER: Self = Self::INTEGER
        .union(Self::ALLOW_TRAILING_SIGN)
        .union(Self::ALLOW_DECIMAL_POINT)
        .union(Self::ALLOW_THOUSANDS);
    pub const FLOAT: Self = Self::INTEGER
        .union(Self::ALLOW_DECIMAL_POINT)
        .union(Self::ALLOW_EXPONENT);
    pub const CURRENCY: Self = Self::NUMBER
        .union(Self::ALLOW_PARENTHESES)
        .union(Self::ALLOW_CURRENCY_SYMBOL);
    pub const ANY: Self = Self::CURRENCY.union(Self::ALLOW_EXPONENT);
}

style_flags!(DateTimeStyles {
    ALLOW_LEADING_WHITE = 1 << 0,
    ALLOW_TRAILING_WHITE = 1 << 1,
    /// Text without an offset is taken as UTC
    ASSUME_UNIVERSAL = 1 << 2,
    /// Parsed values with an offset are converted to UTC
    ADJUST_TO_UNIVERSAL = 1 << 3,
});

impl DateTimeStyles {
    pub const ALLOW_WHITE_SPACES: Self =
        Self::ALLOW_LEADING_WHITE.union(Self::ALLOW_TRAILING_WHITE);
}

/// Formatting and parsing options for one converted type or member
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeConverterOptions {
    pub culture: Option<Culture>,
    pub date_time_style: Option<DateTimeStyles>,
    pub number_style: Option<NumberStyles>,
    /// Format strings; the first is used on write, all are tried on read
    pub formats: Option<Vec<String>>,
    pub enum_ignore_case: Option<bool>,
    pub treat_null_as_default: Option<bool>,
    pub boolean_true_values: Vec<String>,
    pub boolean_false_values: Vec<String>,
    pub null_values: Vec<String>,
}

impl TypeConverterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = Some(culture);
        self
    }

    pub fn with_date_time_style(mut self, style: DateTimeStyles) -> Self {
        self.date_time_style = Some(style);
        self
    }

    pub fn with_number_style(mut self, style: NumberStyles) -> Self {
        self.number_style = Some(style);
        self
    }

    pub fn with_format(self, format: impl Into<String>) -> Self {
        self.with_formats([format])
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_enum_ignore_case(mut self, enabled: bool) -> Self {
        self.enum_ignore_case = Some(enabled);
        self
    }

    pub fn with_treat_null_as_default(mut self, enabled: bool) -> Self {
        self.treat_null_as_default = Some(enabled);
        self
    }

    pub fn with_boolean_true_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.boolean_true_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_boolean_false_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.boolean_false_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_null_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Overlay `other` on top of `self`.
    ///
    /// Scalar options are replaced when `other` sets them. The literal sets
    /// are replaced wholesale, and only when `other`'s set is not the
    /// built-in empty set.
    pub fn merge_from(&mut self, other: &TypeConverterOptions) {
        if other.culture.is_some() {
            self.culture = other.culture.clone();
        }
        if other.date_time_style.is_some() {
            self.date_time_style = other.date_time_style;
        }
        if other.number_style.is_some() {
            self.number_style = other.number_style;
        }
        if other.formats.is_some() {
            self.formats = other.formats.clone();
        }
        if other.enum_ignore_case.is_some() {
            self.enum_ignore_case = other.enum_ignore_case;
        }
        if other.treat_null_as_default.is_some() {
            self.treat_null_as_default = other.treat_null_as_default;
        }
        if !other.boolean_true_values.is_empty() {
            self.boolean_true_values = other.boolean_true_values.clone();
        }
        if !other.boolean_false_values.is_empty() {
            self.boolean_false_values = other.boolean_false_values.clone();
        }
        if !other.null_values.is_empty() {
            self.null_values = other.null_values.clone();
        }
    }

    /// Merge a sequence of options, later entries taking precedence
    pub fn merge<'a, I>(sources: I) -> Self
    where
        I: IntoIterator<Item = &'a TypeConverterOptions>,
    {
        let mut merged = Self::default();
        for source in sources {
            merged.merge_from(source);
        }
        merged
    }

    /// Culture in effect, invariant when none was set
    pub fn culture(&self) -> Cow<'_, Culture> {
        match &self.culture {
            Some(culture) => Cow::Borrowed(culture),
            None => Cow::Owned(Culture::invariant()),
        }
    }

    pub fn first_format(&self) -> Option<&str> {
        self.formats
            .as_ref()
            .and_then(|formats| formats.first())
            .map(String::as_str)
    }

    pub fn formats(&self) -> &[String] {
        self.formats.as_deref().unwrap_or(&[])
    }

    pub fn is_null_token(&self, text: &str) -> bool {
        self.null_values.iter().any(|token| token == text)
    }
}

/// Options registered per converted type
#[derive(Debug, Clone, Default)]
pub struct TypeConverterOptionsCache {
    options: HashMap<TypeId, TypeConverterOptions>,
}

impl TypeConverterOptionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register options for `T`, replacing any previous registration
    pub fn add<T: Any>(&mut self, options: TypeConverterOptions) {
        self.options.insert(TypeId::of::<T>(), options);
    }

    pub fn remove<T: Any>(&mut self) -> Option<TypeConverterOptions> {
        self.options.remove(&TypeId::of::<T>())
    }

    pub fn get<T: Any>(&self) -> Option<&TypeConverterOptions> {
        self.get_by_id(TypeId::of::<T>())
    }

    /// Registered options for `T`, created empty on first access
    pub fn entry<T: Any>(&mut self) -> &mut TypeConverterOptions {
        self.options.entry(TypeId::of::<T>()).or_default()
    }

    pub fn get_by_id(&self, type_id: TypeId) -> Option<&TypeConverterOptions> {
        self.options.get(&type_id)
    }

    pub fn clear(&mut self) {
        self.options.clear();
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
