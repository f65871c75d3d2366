//! Normalized open configuration
//!
//! Callers describe an open either with the builder methods or with one of
//! the classic flag strings (`"r"`, `"w+"`, `"ax"`, ...). Either way the
//! retry engine only ever sees this one fixed shape.

use crate::error::Error;
use std::str::FromStr;

/// How a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    read: bool,
    write: bool,
    append: bool,
    create: bool,
    truncate: bool,
    create_new: bool,
    mode: Option<u32>,
}

impl OpenOptions {
    /// Nothing enabled; pick access with the builder methods
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read: false,
            write: false,
            append: false,
            create: false,
            truncate: false,
            create_new: false,
            mode: None,
        }
    }

    /// Equivalent of flag `"r"`
    #[must_use]
    pub const fn read_only() -> Self {
        let mut options = Self::new();
        options.read = true;
        options
    }

    /// Equivalent of flag `"w"`
    #[must_use]
    pub const fn write_truncate() -> Self {
        let mut options = Self::new();
        options.write = true;
        options.create = true;
        options.truncate = true;
        options
    }

    /// Equivalent of flag `"a"`
    #[must_use]
    pub const fn append_create() -> Self {
        let mut options = Self::new();
        options.append = true;
        options.create = true;
        options
    }

    /// Enable reading
    pub fn read(&mut self, read: bool) -> &mut Self {
        self.read = read;
        self
    }

    /// Enable writing
    pub fn write(&mut self, write: bool) -> &mut Self {
        self.write = write;
        self
    }

    /// Append writes to the end of the file
    pub fn append(&mut self, append: bool) -> &mut Self {
        self.append = append;
        self
    }

    /// Create the file if it is missing
    pub fn create(&mut self, create: bool) -> &mut Self {
        self.create = create;
        self
    }

    /// Truncate an existing file
    pub fn truncate(&mut self, truncate: bool) -> &mut Self {
        self.truncate = truncate;
        self
    }

    /// Fail if the file already exists
    pub fn create_new(&mut self, create_new: bool) -> &mut Self {
        self.create_new = create_new;
        self
    }

    /// Permission bits for a newly created file (Unix only)
    pub fn mode(&mut self, mode: u32) -> &mut Self {
        self.mode = Some(mode);
        self
    }

    /// Whether reading is enabled
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read
    }

    /// Whether writing (or appending) is enabled
    #[must_use]
    pub const fn is_write(&self) -> bool {
        self.write || self.append
    }

    /// Whether writes append
    #[must_use]
    pub const fn is_append(&self) -> bool {
        self.append
    }

    /// Convert to compio's open options
    ///
    /// compio addresses files positionally, so append mode is expressed
    /// with `O_APPEND` on Unix and as plain write access elsewhere.
    #[must_use]
    pub fn to_compio(&self) -> compio::fs::OpenOptions {
        let mut options = compio::fs::OpenOptions::new();
        options
            .read(self.read)
            .write(self.is_write())
            .create(self.create)
            .truncate(self.truncate)
            .create_new(self.create_new);

        #[cfg(unix)]
        {
            if self.append {
                options.custom_flags(libc::O_APPEND);
            }
            if let Some(mode) = self.mode {
                options.mode(mode);
            }
        }

        options
    }

    /// Convert to `std` open options
    #[must_use]
    pub fn to_std(&self) -> std::fs::OpenOptions {
        let mut options = std::fs::OpenOptions::new();
        options
            .read(self.read)
            .write(self.write)
            .append(self.append)
            .create(self.create)
            .truncate(self.truncate)
            .create_new(self.create_new);

        #[cfg(unix)]
        if let Some(mode) = self.mode {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }

        options
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::read_only()
    }
}

impl FromStr for OpenOptions {
    type Err = Error;

    /// Parse a classic flag string
    ///
    /// | flags | meaning |
    /// |---|---|
    /// | `r` | read, must exist |
    /// | `r+` / `rs+` | read + write, must exist |
    /// | `w` / `wx` | write, create, truncate (`x`: must not exist) |
    /// | `w+` / `wx+` | as `w`, plus read |
    /// | `a` / `ax` | append, create (`x`: must not exist) |
    /// | `a+` / `ax+` | as `a`, plus read |
    fn from_str(flags: &str) -> Result<Self, Error> {
        let mut options = Self::new();
        match flags {
            "r" => {
                options.read(true);
            }
            "r+" | "rs+" | "sr+" => {
                options.read(true).write(true);
            }
            "w" | "wx" | "xw" => {
                options.write(true).create(true).truncate(true);
            }
            "w+" | "wx+" | "xw+" => {
                options.read(true).write(true).create(true).truncate(true);
            }
            "a" | "ax" | "xa" | "as" | "sa" => {
                options.append(true).create(true);
            }
            "a+" | "ax+" | "xa+" | "as+" | "sa+" => {
                options.read(true).append(true).create(true);
            }
            other => return Err(Error::InvalidFlags(other.to_string())),
        }
        if flags.contains('x') {
            options.create_new(true);
        }
        Ok(options)
    }
}
