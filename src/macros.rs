#[macro_export]
macro_rules! dummy {
    ($t:expr) => {
        ()
    };
}

/// Declares a fieldless enum naming one of the chip's numbered slots (buffers,
/// masks, filters), together with index conversions.
#[macro_export]
macro_rules! slot_def {
    (
        $(#[doc = $doc:expr])*
        $name:ident => {
            $(
                $(#[doc = $slot_doc:expr])*
                $slot:ident = $idx:literal
            ),*
        }
    ) => {
        $(#[doc = $doc])*
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
        pub enum $name {
            $(
                $(#[doc = $slot_doc])*
                $slot = $idx,
            )*
        }

        impl $name {
            #[doc = concat!("All valid options for [`", stringify!($name), "`].")]
            pub const ALL: [Self; <[_]>::len(&[$($crate::dummy!($slot)),*])] = [$(Self::$slot),*];

            #[doc = concat!("Numeric index of the [`", stringify!($name), "`] on the chip.")]
            #[inline]
            pub const fn index(self) -> u8 {
                self as u8
            }

            #[doc = concat!("Looks up a [`", stringify!($name), "`] by index, `None` if the chip has no such slot.")]
            pub const fn from_index(index: u8) -> Option<Self> {
                match index {
                    $($idx => Some(Self::$slot),)*
                    _ => None,
                }
            }
        }
    };
}
