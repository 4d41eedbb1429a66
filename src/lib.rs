//! Options carried into a kexec-style kernel load, their JSON form, and a
//! reference helper that acquires the kernel, initramfs and device tree the
//! way the options ask for.

pub mod kexec_setup;
