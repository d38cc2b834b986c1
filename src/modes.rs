mod sealed {
    pub trait Sealed {}
}

pub trait ActiveMode: sealed::Sealed {
    fn mode_name(&self) -> &'static str;
}

macro_rules! impl_mode {
    ($mode:ident) => {
        impl sealed::Sealed for $mode {}
        impl ActiveMode for $mode {
            fn mode_name(&self) -> &'static str {
                ::std::stringify!($mode)
            }
        }
    };
}

/// Raw bit-bang mode, entered by the connection handshake.
pub struct BitBang;
impl_mode!(BitBang);

/// I2C bridge mode.
pub struct I2c;
impl_mode!(I2c);

/// Runtime view of the adapter mode, tracked by the link so it can be
/// returned to the user terminal from wherever it ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Modes {
    Terminal,
    BitBang,
    I2c,
}

impl Modes {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Modes::Terminal => "terminal",
            Modes::BitBang => BitBang.mode_name(),
            Modes::I2c => I2c.mode_name(),
        }
    }
}
