pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use futures::{
    future,
    stream::{self, Stream, StreamExt as _, TryStreamExt as _},
};
pub use itertools::{izip, Itertools as _};
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    cmp,
    fmt::Debug,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use tch::{kind::FLOAT_CPU, Device, IndexOp, Kind, Tensor};
pub use tch_tensor_like::TensorLike;

unzip_n::unzip_n!(pub 3);
