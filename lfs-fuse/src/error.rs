use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, BuildError>;

/// 任何错误都会中止构建，残缺的镜像不可使用
#[derive(Debug)]
pub enum BuildError {
    /// 命令行不合法、名字含 `/`，或文件超出大小上限
    InvalidArgument(String),
    /// inode 或块耗尽
    Exhausted(&'static str),
    /// 宿主机文件或镜像读写失败
    Io { context: String, source: io::Error },
}

impl BuildError {
    pub fn io(context: impl fmt::Display, source: io::Error) -> Self {
        Self::Io {
            context: context.to_string(),
            source,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "{msg}"),
            Self::Exhausted(what) => write!(f, "out of {what}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
